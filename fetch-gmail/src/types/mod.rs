pub mod labels;

/// One catalog row
///
/// Created bare by discovery (only `id` set) and filled in once by hydration.
/// `timestamp == 0` means the record has not been hydrated yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: String,
    pub from: String,
    pub delivered_to: String,
    pub subject: String,
    pub timestamp: i64,
    pub labels: Vec<String>,
}

impl ItemRecord {
    /// A freshly discovered record with every metadata field defaulted
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from: String::new(),
            delivered_to: String::new(),
            subject: String::new(),
            timestamp: 0,
            labels: Vec::new(),
        }
    }
}

/// Full metadata overwrite for an existing record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUpdate {
    pub id: String,
    pub from: String,
    pub delivered_to: String,
    pub subject: String,
    pub timestamp: i64,
    pub labels: Vec<String>,
}

/// Bearer credential handed to the remote services
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

// Keep the token out of debug logs.
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

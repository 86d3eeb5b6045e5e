use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::types::AccessToken;

/// One page of the remote message listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub ids: Vec<String>,
    /// Cursor for the following page, `None` once the listing is exhausted
    pub next_cursor: Option<String>,
}

/// Metadata of one remote message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDetail {
    /// Creation time as reported by the remote
    pub created_at: i64,
    /// Keyed by lowercased header name
    pub headers: HashMap<String, String>,
    pub labels: Vec<String>,
}

/// Yields a bearer usable by the remote services, refreshing it when needed
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_token(&self) -> Result<AccessToken, FetchError>;
}

#[async_trait]
pub trait RemoteListingService: Send + Sync {
    async fn list(
        &self,
        token: &AccessToken,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ListingPage, FetchError>;
}

#[async_trait]
pub trait RemoteItemService: Send + Sync {
    async fn get(&self, token: &AccessToken, id: &str) -> Result<ItemDetail, FetchError>;
}

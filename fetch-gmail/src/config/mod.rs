use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::FetchError;
use crate::services::sync::{SyncOptions, MAX_PAGE_SIZE};

pub const DATABASE_NAME: &str = "messages.sqlite3";
pub const OUTPUT_NAME: &str = "messages.csv";
pub const CLIENT_SECRETS_NAME: &str = "credentials.json";
pub const TOKEN_NAME: &str = "token.json";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

/// Pacing of the remote requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds to pause between two requests
    pub delay_secs: f64,

    /// Keep listing after a page with nothing new
    pub fullscan: bool,

    /// Ids per listing request (1..=500)
    pub page_size: u32,
}

/// Where the catalog and its export live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: PathBuf,
    pub output: PathBuf,
}

/// OAuth client secrets and the persisted token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub client_secrets: PathBuf,
    pub token: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delay_secs: 0.25,
            fullscan: false,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DATABASE_NAME),
            output: PathBuf::from(OUTPUT_NAME),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_secrets: PathBuf::from(CLIENT_SECRETS_NAME),
            token: PathBuf::from(TOKEN_NAME),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self, FetchError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FetchError> {
        if !self.sync.delay_secs.is_finite() || self.sync.delay_secs < 0.0 {
            return Err(FetchError::Config(format!(
                "delay must be a non-negative number of seconds, got {}",
                self.sync.delay_secs
            )));
        }
        if self.sync.page_size == 0 || self.sync.page_size > MAX_PAGE_SIZE {
            return Err(FetchError::Config(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.sync.page_size
            )));
        }
        Ok(())
    }

    pub fn sync_options(&self) -> Result<SyncOptions, FetchError> {
        self.validate()?;
        Ok(SyncOptions {
            delay: Duration::from_secs_f64(self.sync.delay_secs),
            fullscan: self.sync.fullscan,
            page_size: self.sync.page_size,
        })
    }
}

/// Get default config paths
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // XDG config path
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("fetch-gmail").join("config.toml"));
    }

    // Home directory fallback
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".fetch-gmail.toml"));
    }

    paths
}

/// Load the explicit config file, else the first default path that exists,
/// else built-in defaults
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, FetchError> {
    if let Some(path) = explicit {
        return load_config_from_path(path);
    }

    for path in default_config_paths() {
        if path.exists() {
            info!("Found config at: {:?}", path);
            return load_config_from_path(&path);
        }
    }

    info!("No config file found, using defaults");
    Ok(AppConfig::default())
}

pub fn load_config_from_path(path: &Path) -> Result<AppConfig, FetchError> {
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .map_err(|e| FetchError::Config(format!("Failed to read config {}: {}", path.display(), e)))?;

    AppConfig::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.storage.database, PathBuf::from("messages.sqlite3"));
        assert_eq!(config.storage.output, PathBuf::from("messages.csv"));

        let options = config.sync_options().unwrap();
        assert_eq!(options.delay, Duration::from_millis(250));
        assert!(!options.fullscan);
        assert_eq!(options.page_size, 500);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
[sync]
delay_secs = 1.5
fullscan = true

[storage]
database = "/var/lib/mail/catalog.sqlite3"
"#,
        )
        .unwrap();

        assert_eq!(config.sync.delay_secs, 1.5);
        assert!(config.sync.fullscan);
        assert_eq!(config.sync.page_size, 500);
        assert_eq!(config.storage.database, PathBuf::from("/var/lib/mail/catalog.sqlite3"));
        assert_eq!(config.storage.output, PathBuf::from("messages.csv"));
        assert_eq!(config.auth.token, PathBuf::from("token.json"));
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        let result = AppConfig::from_toml("[sync]\ndelay_secs = -0.5\n");
        assert!(matches!(result, Err(FetchError::Config(_))));
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(matches!(
            AppConfig::from_toml("[sync]\npage_size = 0\n"),
            Err(FetchError::Config(_))
        ));
        assert!(matches!(
            AppConfig::from_toml("[sync]\npage_size = 501\n"),
            Err(FetchError::Config(_))
        ));
        assert_eq!(AppConfig::from_toml("[sync]\npage_size = 100\n").unwrap().sync.page_size, 100);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(AppConfig::from_toml("[sync"), Err(FetchError::Config(_))));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[auth]\ntoken = \"/tmp/token.json\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.auth.token, PathBuf::from("/tmp/token.json"));

        let missing = dir.path().join("nope.toml");
        assert!(matches!(load_config(Some(&missing)), Err(FetchError::Config(_))));
    }
}

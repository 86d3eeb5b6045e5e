//! File-backed OAuth credentials
//!
//! The client registration comes from the `credentials.json` downloaded from
//! the Google Cloud console. Tokens are kept in a separate token file so a
//! second run can skip the browser consent step.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::oauth::{self, OAuthTokens, ProviderConfig, GMAIL_READONLY_SCOPE};
use crate::services::remote::CredentialProvider;
use crate::types::AccessToken;

const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// `credentials.json` as issued for "Desktop app" (or "Web") clients
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

/// Read the client registration from a Google client secrets file
pub fn load_client_config(path: &Path) -> Result<ProviderConfig, FetchError> {
    let content = fs::read_to_string(path).map_err(|e| {
        FetchError::Auth(format!("Failed to read client secrets {}: {}", path.display(), e))
    })?;
    parse_client_config(&content)
}

fn parse_client_config(content: &str) -> Result<ProviderConfig, FetchError> {
    let file: ClientSecretsFile = serde_json::from_str(content)
        .map_err(|e| FetchError::Auth(format!("Invalid client secrets: {}", e)))?;

    let secrets = file
        .installed
        .or(file.web)
        .ok_or_else(|| FetchError::Auth("Client secrets have no 'installed' or 'web' section".into()))?;

    Ok(ProviderConfig {
        client_id: secrets.client_id,
        client_secret: secrets.client_secret,
        auth_url: secrets.auth_uri.unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
        token_url: secrets.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        scopes: vec![GMAIL_READONLY_SCOPE.to_string()],
    })
}

/// Credential provider persisting its tokens to a JSON file
pub struct TokenFileProvider {
    config: ProviderConfig,
    token_path: PathBuf,
    tokens: Mutex<OAuthTokens>,
}

impl TokenFileProvider {
    /// Reuse the stored tokens when possible, otherwise run the consent flow.
    ///
    /// The resulting tokens are persisted before returning.
    pub async fn load_or_authenticate(secrets_path: &Path, token_path: &Path) -> Result<Self, FetchError> {
        let config = load_client_config(secrets_path)?;

        let stored = read_tokens(token_path)?;
        let tokens = match stored {
            Some(tokens) if !tokens.should_refresh() => {
                debug!("Using stored tokens from {}", token_path.display());
                tokens
            }
            Some(OAuthTokens {
                refresh_token: Some(refresh_token),
                ..
            }) => {
                info!("Stored access token expired, refreshing");
                oauth::refresh_access_token(&config, &refresh_token).await?
            }
            _ => {
                info!("No usable stored tokens, starting browser authorization");
                oauth::authorize_installed_app(&config).await?
            }
        };

        let provider = Self::new(config, token_path.to_path_buf(), tokens);
        provider.persist().await?;
        Ok(provider)
    }

    pub fn new(config: ProviderConfig, token_path: PathBuf, tokens: OAuthTokens) -> Self {
        Self {
            config,
            token_path,
            tokens: Mutex::new(tokens),
        }
    }

    /// Refresh the access token if it expires within the refresh margin.
    ///
    /// Returns whether a refresh happened. New tokens are persisted.
    pub async fn refresh_if_expired(&self) -> Result<bool, FetchError> {
        let mut tokens = self.tokens.lock().await;
        if !tokens.should_refresh() {
            return Ok(false);
        }

        let refresh_token = tokens
            .refresh_token
            .clone()
            .ok_or_else(|| FetchError::Auth("Access token expired and no refresh token is stored".into()))?;

        *tokens = oauth::refresh_access_token(&self.config, &refresh_token).await?;
        write_tokens(&self.token_path, &tokens)?;
        Ok(true)
    }

    pub async fn persist(&self) -> Result<(), FetchError> {
        let tokens = self.tokens.lock().await;
        write_tokens(&self.token_path, &tokens)
    }
}

#[async_trait]
impl CredentialProvider for TokenFileProvider {
    async fn get_token(&self) -> Result<AccessToken, FetchError> {
        self.refresh_if_expired().await?;
        let tokens = self.tokens.lock().await;
        Ok(AccessToken::new(tokens.access_token.clone()))
    }
}

/// A missing or malformed token file just means we have to authenticate.
/// Any other read failure is reported.
fn read_tokens(path: &Path) -> Result<Option<OAuthTokens>, FetchError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(FetchError::Auth(format!(
                "Failed to read token file {}: {}",
                path.display(),
                e
            )))
        }
    };

    match serde_json::from_str(&content) {
        Ok(tokens) => Ok(Some(tokens)),
        Err(e) => {
            warn!("Ignoring malformed token file {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

fn write_tokens(path: &Path, tokens: &OAuthTokens) -> Result<(), FetchError> {
    let json = serde_json::to_string_pretty(tokens)
        .map_err(|e| FetchError::Auth(format!("Failed to serialize tokens: {}", e)))?;
    fs::write(path, json)
        .map_err(|e| FetchError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
    debug!("Saved tokens to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_client_secrets() {
        let config = parse_client_config(
            r#"{"installed": {
                "client_id": "abc.apps.googleusercontent.com",
                "project_id": "fetch",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "client_secret": "GOCSPX-secret",
                "redirect_uris": ["http://localhost"]
            }}"#,
        )
        .unwrap();

        assert_eq!(config.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(config.client_secret.as_deref(), Some("GOCSPX-secret"));
        assert_eq!(config.token_url, "https://oauth2.googleapis.com/token");
        assert_eq!(config.scopes, vec![GMAIL_READONLY_SCOPE.to_string()]);
    }

    #[test]
    fn test_parse_rejects_unknown_layout() {
        assert!(matches!(parse_client_config(r#"{"other": {}}"#), Err(FetchError::Auth(_))));
        assert!(matches!(parse_client_config("not json"), Err(FetchError::Auth(_))));
    }

    #[test]
    fn test_token_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        assert!(read_tokens(&path).unwrap().is_none());

        let tokens = OAuthTokens {
            access_token: "ya29.token".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_at: Some(1_900_000_000),
            scopes: vec![GMAIL_READONLY_SCOPE.to_string()],
        };
        write_tokens(&path, &tokens).unwrap();

        let loaded = read_tokens(&path).unwrap().unwrap();
        assert_eq!(loaded.access_token, "ya29.token");
        assert_eq!(loaded.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(loaded.expires_at, Some(1_900_000_000));
    }

    #[test]
    fn test_malformed_token_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(read_tokens(&path).unwrap().is_none());
    }

    #[test]
    fn test_unreadable_token_file_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();

        // A directory exists but cannot be read as a file
        assert!(matches!(read_tokens(dir.path()), Err(FetchError::Auth(_))));
    }

    #[tokio::test]
    async fn test_fresh_token_is_served_without_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let config = parse_client_config(r#"{"installed": {"client_id": "id"}}"#).unwrap();
        let tokens = OAuthTokens {
            access_token: "valid".to_string(),
            refresh_token: None,
            expires_at: Some(chrono::Utc::now().timestamp() + 3600),
            scopes: Vec::new(),
        };
        let provider = TokenFileProvider::new(config, dir.path().join("token.json"), tokens);

        assert!(!provider.refresh_if_expired().await.unwrap());
        assert_eq!(provider.get_token().await.unwrap().secret(), "valid");
    }

    #[tokio::test]
    async fn test_expired_token_without_refresh_token_is_auth_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = parse_client_config(r#"{"installed": {"client_id": "id"}}"#).unwrap();
        let tokens = OAuthTokens {
            access_token: "stale".to_string(),
            refresh_token: None,
            expires_at: Some(0),
            scopes: Vec::new(),
        };
        let provider = TokenFileProvider::new(config, dir.path().join("token.json"), tokens);

        assert!(matches!(provider.get_token().await, Err(FetchError::Auth(_))));
    }
}

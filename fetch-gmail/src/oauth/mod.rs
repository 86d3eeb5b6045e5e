//! OAuth2 installed-app flow for Gmail
//!
//! Implements OAuth2 with PKCE and a loopback redirect, the flow Google
//! documents for desktop applications:
//! - build the consent URL and wait for the browser to hit `127.0.0.1:<port>`
//! - exchange the authorization code for tokens
//! - refresh the access token later with the refresh token

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use oauth2::{
    basic::BasicClient, AuthUrl, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenUrl,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::FetchError;

/// Read-only access to the mailbox is all the sync needs
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Refresh when less than this many seconds of validity remain
const REFRESH_MARGIN_SECS: i64 = 300;

/// Errors that can occur during OAuth operations
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("OAuth configuration error: {0}")]
    Configuration(String),

    #[error("OAuth request failed: {0}")]
    Request(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Invalid state parameter")]
    InvalidState,

    #[error("Authorization denied: {0}")]
    Denied(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
}

impl From<OAuthError> for FetchError {
    fn from(e: OAuthError) -> Self {
        FetchError::Auth(e.to_string())
    }
}

/// OAuth2 tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// Access token for API requests
    pub access_token: String,
    /// Refresh token for obtaining new access tokens
    pub refresh_token: Option<String>,
    /// Token expiration time (Unix timestamp)
    pub expires_at: Option<i64>,
    /// Scopes granted
    pub scopes: Vec<String>,
}

impl OAuthTokens {
    /// Check if tokens need refresh (within 5 minutes of expiry)
    pub fn should_refresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - chrono::Utc::now().timestamp() < REFRESH_MARGIN_SECS,
            // No expiry info, assume we should refresh
            None => true,
        }
    }
}

/// OAuth2 client registration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    /// Installed apps get a (non-confidential) secret from Google
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

/// Run the full consent flow and return fresh tokens.
///
/// Blocks until the browser is redirected back to the loopback listener.
pub async fn authorize_installed_app(config: &ProviderConfig) -> Result<OAuthTokens, OAuthError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| OAuthError::Request(format!("Failed to bind loopback listener: {}", e)))?;
    let port = listener
        .local_addr()
        .map_err(|e| OAuthError::Request(e.to_string()))?
        .port();
    let redirect_uri = format!("http://127.0.0.1:{}", port);

    let (auth_url, csrf_token, pkce_verifier) = build_authorization_url(config, &redirect_uri)?;

    info!("Please visit this URL to authorize this application: {}", auth_url);
    println!("Please visit this URL to authorize this application:\n{}", auth_url);

    let code = receive_redirect(&listener, &csrf_token).await?;

    exchange_code_for_tokens(config, &code, &pkce_verifier, &redirect_uri).await
}

/// Build the consent URL with a PKCE challenge
///
/// Returns the URL, the state token to expect back and the PKCE verifier.
pub fn build_authorization_url(
    config: &ProviderConfig,
    redirect_uri: &str,
) -> Result<(String, String, PkceCodeVerifier), OAuthError> {
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let csrf_token = generate_state_token();

    let client = BasicClient::new(ClientId::new(config.client_id.clone()))
        .set_auth_uri(
            AuthUrl::new(config.auth_url.clone())
                .map_err(|e| OAuthError::Configuration(e.to_string()))?,
        )
        .set_token_uri(
            TokenUrl::new(config.token_url.clone())
                .map_err(|e| OAuthError::Configuration(e.to_string()))?,
        )
        .set_redirect_uri(
            RedirectUrl::new(redirect_uri.to_string())
                .map_err(|e| OAuthError::Configuration(e.to_string()))?,
        );

    let client = if let Some(secret) = &config.client_secret {
        client.set_client_secret(ClientSecret::new(secret.clone()))
    } else {
        client
    };

    let mut auth_request = client
        .authorize_url(|| CsrfToken::new(csrf_token.clone()))
        .set_pkce_challenge(pkce_challenge);

    for scope in &config.scopes {
        auth_request = auth_request.add_scope(Scope::new(scope.clone()));
    }

    // Google needs access_type and prompt to hand out a refresh token
    let (url, _) = auth_request
        .add_extra_param("access_type", "offline")
        .add_extra_param("prompt", "consent")
        .url();

    Ok((url.to_string(), csrf_token, pkce_verifier))
}

/// Accept loopback connections until one carries the authorization response
async fn receive_redirect(listener: &TcpListener, expected_state: &str) -> Result<String, OAuthError> {
    loop {
        let (mut stream, peer) = listener
            .accept()
            .await
            .map_err(|e| OAuthError::Request(format!("Loopback accept failed: {}", e)))?;
        debug!("OAuth redirect connection from {}", peer);

        let mut request_line = String::new();
        {
            let mut reader = BufReader::new(&mut stream);
            reader
                .read_line(&mut request_line)
                .await
                .map_err(|e| OAuthError::Request(e.to_string()))?;
        }

        let outcome = match parse_redirect_request(&request_line) {
            // Browsers also ask for /favicon.ico and the like
            None => continue,
            Some(params) => check_redirect(params, expected_state),
        };

        let body = match &outcome {
            Ok(_) => "Authentication complete. You may close this window.",
            Err(_) => "Authentication failed. Check the terminal for details.",
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        if let Err(e) = stream.write_all(response.as_bytes()).await {
            warn!("Failed to answer OAuth redirect: {}", e);
        }

        return outcome;
    }
}

/// Query parameters of the redirect
#[derive(Debug, Default, PartialEq, Eq)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Parse `GET /?code=..&state=.. HTTP/1.1`. Returns `None` for requests that
/// are not an authorization response.
fn parse_redirect_request(request_line: &str) -> Option<RedirectParams> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;

    let url = url::Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
    let mut params = RedirectParams::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => params.code = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            _ => {}
        }
    }

    if params.code.is_none() && params.error.is_none() {
        return None;
    }
    Some(params)
}

fn check_redirect(params: RedirectParams, expected_state: &str) -> Result<String, OAuthError> {
    if let Some(error) = params.error {
        return Err(OAuthError::Denied(error));
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(OAuthError::InvalidState);
    }
    params
        .code
        .ok_or_else(|| OAuthError::TokenExchange("Redirect carried no code".to_string()))
}

// ============================================================================
// Token exchange
// ============================================================================

/// Exchange authorization code for tokens
async fn exchange_code_for_tokens(
    config: &ProviderConfig,
    code: &str,
    pkce_verifier: &PkceCodeVerifier,
    redirect_uri: &str,
) -> Result<OAuthTokens, OAuthError> {
    let client = reqwest::Client::new();

    let mut params = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("client_id", config.client_id.as_str()),
        ("code_verifier", pkce_verifier.secret().as_str()),
    ];

    if let Some(secret) = &config.client_secret {
        params.push(("client_secret", secret.as_str()));
    }

    debug!("Exchanging authorization code for tokens");

    let response = client
        .post(&config.token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| OAuthError::Request(e.to_string()))?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!("Token exchange failed: {}", error_text);
        return Err(OAuthError::TokenExchange(error_text));
    }

    let token_response: TokenResponse = response
        .json()
        .await
        .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

    Ok(token_response.into_tokens(None, &config.scopes))
}

/// Refresh an access token
pub async fn refresh_access_token(
    config: &ProviderConfig,
    refresh_token: &str,
) -> Result<OAuthTokens, OAuthError> {
    let client = reqwest::Client::new();

    let mut params = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", config.client_id.as_str()),
    ];

    if let Some(secret) = &config.client_secret {
        params.push(("client_secret", secret.as_str()));
    }

    debug!("Refreshing access token");

    let response = client
        .post(&config.token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| OAuthError::Request(e.to_string()))?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!("Token refresh failed: {}", error_text);
        return Err(OAuthError::RefreshFailed(error_text));
    }

    let token_response: TokenResponse = response
        .json()
        .await
        .map_err(|e| OAuthError::RefreshFailed(e.to_string()))?;

    Ok(token_response.into_tokens(Some(refresh_token), &config.scopes))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
}

impl TokenResponse {
    /// Google does not return a new refresh token on refresh, keep the old one
    fn into_tokens(self, previous_refresh: Option<&str>, requested: &[String]) -> OAuthTokens {
        let expires_at = self
            .expires_in
            .map(|secs| chrono::Utc::now().timestamp() + secs as i64);

        let scopes = match self.scope {
            Some(scope) => scope.split_whitespace().map(String::from).collect(),
            None => requested.to_vec(),
        };

        OAuthTokens {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(String::from)),
            expires_at,
            scopes,
        }
    }
}

/// Generate a cryptographically secure state token
fn generate_state_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

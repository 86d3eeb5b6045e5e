use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::responses::{ListResponse, MessageResponse};
use crate::error::FetchError;
use crate::services::remote::{ItemDetail, ListingPage, RemoteItemService, RemoteListingService};
use crate::types::AccessToken;

pub const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com";

/// Headers requested with `format=metadata`
const METADATA_HEADERS: [&str; 3] = ["From", "Subject", "Delivered-To"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the signed-in user's mailbox (`users/me`)
pub struct GmailClient {
    http: Client,
    base_url: String,
}

impl GmailClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at another host (used by tests)
    pub fn with_base_url(base_url: &str) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Remote(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/gmail/v1/users/me/messages", self.base_url)
    }
}

#[async_trait]
impl RemoteListingService for GmailClient {
    async fn list(
        &self,
        token: &AccessToken,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ListingPage, FetchError> {
        let mut query = vec![("maxResults", page_size.to_string())];
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            query.push(("pageToken", cursor.to_string()));
        }

        debug!("Listing messages (cursor: {:?})", cursor);

        let response = self
            .http
            .get(self.messages_url())
            .bearer_auth(token.secret())
            .query(&query)
            .send()
            .await
            .map_err(|e| FetchError::Remote(format!("List request failed: {}", e)))?;

        let body: ListResponse = decode(response).await?;
        Ok(body.into())
    }
}

#[async_trait]
impl RemoteItemService for GmailClient {
    async fn get(&self, token: &AccessToken, id: &str) -> Result<ItemDetail, FetchError> {
        let mut query = vec![("format", "metadata")];
        for header in METADATA_HEADERS {
            query.push(("metadataHeaders", header));
        }

        let response = self
            .http
            .get(format!("{}/{}", self.messages_url(), id))
            .bearer_auth(token.secret())
            .query(&query)
            .send()
            .await
            .map_err(|e| FetchError::Remote(format!("Get request for {} failed: {}", id, e)))?;

        let body: MessageResponse = decode(response).await?;
        ItemDetail::try_from(body)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, FetchError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!("Gmail API returned {}: {}", status, error_text);
        return Err(FetchError::Remote(format!("{}: {}", status, error_text)));
    }

    response
        .json()
        .await
        .map_err(|e| FetchError::Remote(format!("Failed to parse Gmail response: {}", e)))
}

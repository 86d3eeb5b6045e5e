use std::collections::HashMap;

use serde::Deserialize;

use crate::error::FetchError;
use crate::services::remote::{ItemDetail, ListingPage};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MessageResponse {
    /// Epoch milliseconds, sent as a decimal string
    internal_date: Option<String>,
    label_ids: Option<Vec<String>>,
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

impl From<ListResponse> for ListingPage {
    fn from(response: ListResponse) -> Self {
        ListingPage {
            ids: response.messages.into_iter().map(|m| m.id).collect(),
            next_cursor: response.next_page_token.filter(|token| !token.is_empty()),
        }
    }
}

impl TryFrom<MessageResponse> for ItemDetail {
    type Error = FetchError;

    fn try_from(response: MessageResponse) -> Result<Self, Self::Error> {
        let created_at = match response.internal_date.as_deref() {
            None => 0,
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|e| FetchError::Remote(format!("Invalid internalDate {:?}: {}", raw, e)))?,
        };

        // Header names are case-insensitive, keys are lowercased. Later duplicates win.
        let headers: HashMap<String, String> = response
            .payload
            .map(|p| p.headers)
            .unwrap_or_default()
            .into_iter()
            .map(|h| (h.name.to_ascii_lowercase(), h.value))
            .collect();

        Ok(ItemDetail {
            created_at,
            headers,
            labels: response.label_ids.unwrap_or_default(),
        })
    }
}

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::adapters::sqlite::Catalog;
use crate::error::FetchError;
use crate::services::remote::{CredentialProvider, ItemDetail, RemoteItemService};
use crate::services::sync::{pause, SyncOptions};
use crate::types::RecordUpdate;

const HEADER_FROM: &str = "from";
const HEADER_SUBJECT: &str = "subject";
const HEADER_DELIVERED_TO: &str = "delivered-to";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HydrationReport {
    pub hydrated: usize,
    /// Records the remote reported with a creation time of 0. They stay in
    /// the backlog because 0 is the "not hydrated" marker.
    pub zero_timestamp: usize,
}

/// Fetch metadata for every record still at `timestamp == 0`.
///
/// The work list is derived from the catalog each time, so an interrupted
/// pass picks up exactly the records it had not committed yet.
pub async fn run_hydration(
    catalog: &Catalog,
    items: &dyn RemoteItemService,
    credentials: &dyn CredentialProvider,
    options: &SyncOptions,
) -> Result<HydrationReport, FetchError> {
    let start = Instant::now();
    let backlog = catalog.unhydrated_ids()?;
    let total = backlog.len();
    let mut report = HydrationReport::default();

    for (idx, id) in backlog.enumerate() {
        if idx > 0 {
            pause(options.delay).await;
        }
        info!("Hydrating message {} of {}.", idx + 1, total);

        let token = credentials.get_token().await?;
        let detail = items.get(&token, &id).await?;

        let update = record_update(id, detail);
        if update.timestamp == 0 {
            warn!(
                "Message {} reported a creation time of 0, it will be fetched again next run",
                update.id
            );
            report.zero_timestamp += 1;
        }

        catalog.update_record(&update)?;
        report.hydrated += 1;
    }

    debug!(
        "Hydrated {} messages in {}ms",
        report.hydrated,
        start.elapsed().as_millis()
    );
    Ok(report)
}

/// Map a remote detail onto the catalog columns, defaulting what is missing
fn record_update(id: String, mut detail: ItemDetail) -> RecordUpdate {
    let mut header = |name: &str| detail.headers.remove(name).unwrap_or_default();

    RecordUpdate {
        from: header(HEADER_FROM),
        delivered_to: header(HEADER_DELIVERED_TO),
        subject: header(HEADER_SUBJECT),
        id,
        timestamp: detail.created_at,
        labels: detail.labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_record_update_picks_known_headers() {
        let detail = ItemDetail {
            created_at: 1_700_000_000_000,
            headers: HashMap::from([
                ("from".to_string(), "alice@example.com".to_string()),
                ("subject".to_string(), "Lunch?".to_string()),
                ("delivered-to".to_string(), "me@example.com".to_string()),
                ("x-other".to_string(), "ignored".to_string()),
            ]),
            labels: vec!["INBOX".to_string()],
        };

        let update = record_update("abc".to_string(), detail);

        assert_eq!(
            update,
            RecordUpdate {
                id: "abc".to_string(),
                from: "alice@example.com".to_string(),
                delivered_to: "me@example.com".to_string(),
                subject: "Lunch?".to_string(),
                timestamp: 1_700_000_000_000,
                labels: vec!["INBOX".to_string()],
            }
        );
    }

    #[test]
    fn test_record_update_defaults_missing_fields() {
        let detail = ItemDetail {
            created_at: 5,
            ..Default::default()
        };

        let update = record_update("abc".to_string(), detail);

        assert_eq!(update.from, "");
        assert_eq!(update.delivered_to, "");
        assert_eq!(update.subject, "");
        assert!(update.labels.is_empty());
    }
}

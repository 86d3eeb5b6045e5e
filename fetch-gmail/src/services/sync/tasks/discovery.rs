use std::time::Instant;

use tracing::{debug, info};

use crate::adapters::sqlite::{Catalog, CountFilter};
use crate::error::FetchError;
use crate::services::remote::{CredentialProvider, RemoteListingService};
use crate::services::sync::{pause, SyncOptions};

/// Why a discovery pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStop {
    /// A page held no id the catalog did not already know
    NothingNew,
    /// The listing had no further page
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub pages: u32,
    pub inserted: usize,
    pub stop: DiscoveryStop,
}

/// Walk the remote listing and record every id seen in the catalog.
///
/// Without `fullscan`, stops at the first page where every id is already
/// known. That assumes the listing surfaces new messages first and trades
/// completeness for fewer requests. Any failed request aborts the pass;
/// pages inserted before the failure stay in the catalog.
pub async fn run_discovery(
    catalog: &Catalog,
    listing: &dyn RemoteListingService,
    credentials: &dyn CredentialProvider,
    options: &SyncOptions,
) -> Result<DiscoveryReport, FetchError> {
    let start = Instant::now();
    let mut cursor: Option<String> = None;
    let mut pages = 0;
    let mut inserted = 0;

    let stop = loop {
        info!(
            "Fetching message ids. {} found so far...",
            catalog.count(CountFilter::All)?
        );

        let token = credentials.get_token().await?;
        let page = listing
            .list(&token, cursor.as_deref(), options.page_size)
            .await?;
        pages += 1;

        let has_unseen = options.fullscan || catalog.has_unseen_among(&page.ids)?;

        let new_ids = catalog.insert_identities(&page.ids)?;
        inserted += new_ids;
        debug!("Page {}: {} ids, {} new", pages, page.ids.len(), new_ids);

        if !has_unseen {
            info!("All ids accounted for, assuming we have all ids and stopping.");
            break DiscoveryStop::NothingNew;
        }

        match page.next_cursor.filter(|next| !next.is_empty()) {
            Some(next) => cursor = Some(next),
            None => {
                info!("All ids captured");
                break DiscoveryStop::Exhausted;
            }
        }

        pause(options.delay).await;
    };

    debug!(
        "Discovery finished after {} pages, {} new ids in {}ms",
        pages,
        inserted,
        start.elapsed().as_millis()
    );

    Ok(DiscoveryReport {
        pages,
        inserted,
        stop,
    })
}

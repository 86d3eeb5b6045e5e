pub mod tasks;

use std::time::Duration;

pub use tasks::{run_discovery, run_hydration, DiscoveryReport, DiscoveryStop, HydrationReport};

/// Default pause between two remote requests
pub const DEFAULT_DELAY: Duration = Duration::from_millis(250);

/// Largest page the Gmail listing endpoint will return
pub const MAX_PAGE_SIZE: u32 = 500;

/// Knobs shared by discovery and hydration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Pause between two consecutive remote requests (rate-limit courtesy)
    pub delay: Duration,
    /// Walk every listing page instead of stopping at the first page with
    /// nothing new
    pub fullscan: bool,
    /// Upper bound of ids per listing request
    pub page_size: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            fullscan: false,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Sleep between two requests, skipped entirely for a zero delay
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

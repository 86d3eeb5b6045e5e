mod discovery;
mod hydration;

pub use discovery::{run_discovery, DiscoveryReport, DiscoveryStop};
pub use hydration::{run_hydration, HydrationReport};

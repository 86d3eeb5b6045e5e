//! Sync logic
//!
//! Nothing here knows about HTTP or OAuth. The controllers talk to the
//! remote side only through the traits in `remote`, which keeps them
//! testable against in-process fakes.

pub mod remote;
pub mod sync;

pub use remote::{CredentialProvider, ItemDetail, ListingPage, RemoteItemService, RemoteListingService};

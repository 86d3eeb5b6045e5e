//! Gmail REST API transport
//!
//! Implements the listing and item services on top of the
//! `users.messages.list` and `users.messages.get` endpoints.

mod client;
mod responses;

pub use client::{GmailClient, DEFAULT_BASE_URL};

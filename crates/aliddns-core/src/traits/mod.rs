//! Core traits for the aliddns system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpResolver`]: Discover the host's public addresses
//! - [`DnsApi`]: Single-call access to the DNS provider API
//! - [`StateStore`]: Persistent per-record sync outcomes

pub mod dns_api;
pub mod ip_resolver;
pub mod state_store;

pub use dns_api::{DnsApi, Page, RecordQuery, RecordUpdate};
pub use ip_resolver::IpResolver;
pub use state_store::{RecordState, StateStore};

// # aliddns-core
//
// Core library for the Alibaba Cloud DNS dynamic-address sync engine.
//
// ## Architecture Overview
//
// - **IpResolver**: Trait for discovering the host's public IPv4/IPv6 addresses
// - **DnsApi**: Trait for single provider API calls (list, filter, update)
// - **ProviderClient**: Pagination, idempotent writes, retry with duplicate recheck
// - **SyncEngine**: One cycle over the tracked records, one result per record
// - **Scheduler**: Periodic and manual cycles, one at a time
// - **StateStore**: Persistent last outcome per tracked record
//
// ## Design Principles
//
// 1. **Provider is the source of truth**: every write is preceded by a live read
// 2. **Per-record isolation**: one failing record never aborts the others
// 3. **Library-First**: the daemon is a thin layer over this crate
// 4. **Bounded I/O**: every network call has a timeout

pub mod config;
pub mod engine;
pub mod error;
pub mod ip;
pub mod provider;
pub mod scheduler;
pub mod state;
pub mod traits;
pub mod types;

// Re-export core types for convenience
pub use config::{Credentials, DdnsConfig, IpLookupConfig, UpdatePolicy};
pub use engine::SyncEngine;
pub use error::{Error, Result};
pub use ip::IpFamily;
pub use provider::{ProviderClient, RecordListing};
pub use scheduler::{
    ScheduleStatus, Scheduler, SchedulerConfig, SchedulerEvent, SchedulerHandle, Trigger,
};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{DnsApi, IpResolver, Page, RecordQuery, RecordState, RecordUpdate, StateStore};
pub use types::{
    CurrentIps, DomainRecord, RecordType, SyncResult, SyncStatus, SyncSummary, TrackedRecord,
};

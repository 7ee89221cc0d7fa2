//! Sync engine
//!
//! The SyncEngine is responsible for:
//! - Obtaining the current public addresses via IpResolver
//! - Comparing them against the live provider value of each tracked record
//! - Writing changed addresses via ProviderClient
//! - Reporting one SyncResult per tracked record
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ IpResolver  │─── CurrentIps ───┐
//! └─────────────┘                  │
//!                                  ▼
//!                         ┌──────────────┐
//!   &[TrackedRecord] ───► │  SyncEngine  │ ───► Vec<SyncResult>
//!                         └──────────────┘
//!                                  │
//!                                  ▼
//!                         ┌────────────────┐
//!                         │ ProviderClient │
//!                         │ (check, write) │
//!                         └────────────────┘
//! ```
//!
//! ## Per-record Flow
//!
//! 1. Non-address record type → skipped
//! 2. No address for the record family → skipped
//! 3. Live value equals the address → skipped
//! 4. Otherwise update; failures become error results
//!
//! A failing record never aborts the records after it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::provider::ProviderClient;
use crate::traits::IpResolver;
use crate::types::{CurrentIps, SyncResult, SyncStatus, SyncSummary, TrackedRecord};

/// Reconciles tracked records with the host's public addresses
///
/// ## Threading
///
/// `sync` takes `&self`; the engine can be shared behind an `Arc`. Callers
/// are expected to run one cycle at a time (the scheduler guarantees this).
///
/// ## Cancellation
///
/// [`SyncEngine::cancel`] is observed between records. Records not yet
/// processed are reported as skipped so every tracked record still gets a
/// result.
pub struct SyncEngine {
    resolver: Arc<dyn IpResolver>,
    provider: ProviderClient,
    cancelled: AtomicBool,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(resolver: Arc<dyn IpResolver>, provider: ProviderClient) -> Self {
        Self {
            resolver,
            provider,
            cancelled: AtomicBool::new(false),
        }
    }

    /// The provider client used for lookups and writes
    pub fn provider(&self) -> &ProviderClient {
        &self.provider
    }

    /// Request that the running cycle stop after the current record
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation request
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run one sync cycle over `records`
    ///
    /// # Parameters
    ///
    /// - `records`: snapshot of the tracked records, processed in order
    /// - `current_ips`: addresses to publish; resolved when `None`
    ///
    /// # Returns
    ///
    /// - `Ok(results)`: one result per record, in record order
    /// - `Err(Error::NotConfigured)`: no provider account
    /// - `Err(Error::NoAddressAvailable)`: neither family could be resolved
    pub async fn sync(
        &self,
        records: &[TrackedRecord],
        current_ips: Option<CurrentIps>,
    ) -> Result<Vec<SyncResult>> {
        if !self.provider.is_configured() {
            return Err(Error::NotConfigured);
        }

        let ips = match current_ips {
            Some(ips) => ips,
            None => self.resolver.resolve().await,
        };

        if ips.is_empty() {
            return Err(Error::NoAddressAvailable);
        }

        if records.is_empty() {
            debug!("No tracked records, nothing to sync");
            return Ok(Vec::new());
        }

        info!("Syncing {} records ({})", records.len(), ips);

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let result = if self.is_cancelled() {
                SyncResult::skipped(record, "sync cancelled")
            } else {
                self.sync_record(record, &ips).await
            };
            log_result(&result);
            results.push(result);
        }

        info!("Sync finished: {}", SyncSummary::from(results.as_slice()));
        Ok(results)
    }

    async fn sync_record(&self, record: &TrackedRecord, ips: &CurrentIps) -> SyncResult {
        let Some(family) = record.record_type.ip_family() else {
            return SyncResult::skipped(
                record,
                format!("unsupported record type: {}", record.record_type),
            );
        };

        let Some(address) = ips.for_family(family) else {
            return SyncResult::skipped(record, format!("could not obtain {family} address"));
        };

        let live = match self
            .provider
            .get_record_value(&record.domain_name, &record.rr, &record.record_type)
            .await
        {
            Ok(live) => live,
            Err(e) => return SyncResult::error(record, e.to_string()),
        };

        if live.as_deref() == Some(address) {
            return SyncResult::skipped(record, format!("address unchanged: {address}"))
                .with_values(live.clone(), live);
        }

        debug!(
            "{} ({}) needs update: {:?} -> {}",
            record.fqdn(),
            record.record_type,
            live,
            address
        );

        match self
            .provider
            .update_record(
                &record.record_id,
                &record.rr,
                &record.record_type,
                address,
                &record.domain_name,
            )
            .await
        {
            Ok(()) => SyncResult::success(record, live, address),
            Err(e) => SyncResult::error(record, e.to_string())
                .with_values(live, Some(address.to_string())),
        }
    }
}

fn log_result(result: &SyncResult) {
    match result.status {
        SyncStatus::Success => {
            info!("{} ({}): {}", result.fqdn(), result.record_type, result.message)
        }
        SyncStatus::Skipped => {
            debug!("{} ({}): {}", result.fqdn(), result.record_type, result.message)
        }
        SyncStatus::Error => {
            warn!("{} ({}): {}", result.fqdn(), result.record_type, result.message)
        }
    }
}

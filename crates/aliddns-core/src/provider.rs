//! Provider client
//!
//! [`ProviderClient`] is the only component that talks to the DNS provider.
//! It layers pagination, read-before-write idempotency and the
//! retry/duplicate-recheck loop on top of a single-call [`DnsApi`].
//!
//! ## Update Flow
//!
//! ```text
//! update_record()
//!     │
//!     ├── get_record_value() == target ──► Ok (no write)
//!     │
//!     ├── normalize rr / type, validate value
//!     │
//!     └── for attempt in 1..=max_attempts
//!             │
//!             ├── update_domain_record() ──► Ok
//!             │
//!             └── Err
//!                  ├── duplicate conflict && live value == target ──► Ok
//!                  └── sleep(retry_delay), retry
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::UpdatePolicy;
use crate::error::{Error, Result};
use crate::ip;
use crate::traits::{DnsApi, Page, RecordQuery, RecordUpdate};
use crate::types::{DomainRecord, RecordType};

/// Records of every domain, plus the domains whose listing failed
#[derive(Debug, Clone, Default)]
pub struct RecordListing {
    pub records: Vec<DomainRecord>,
    /// `(domain, error message)` for each domain that could not be listed
    pub failures: Vec<(String, String)>,
}

impl RecordListing {
    /// Whether every domain was listed successfully
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// High-level access to the DNS provider
///
/// Cheap to clone; clones share the underlying [`DnsApi`].
#[derive(Clone)]
pub struct ProviderClient {
    api: Option<Arc<dyn DnsApi>>,
    policy: UpdatePolicy,
}

impl ProviderClient {
    /// Create a configured client
    pub fn new(api: Arc<dyn DnsApi>, policy: UpdatePolicy) -> Self {
        Self {
            api: Some(api),
            policy,
        }
    }

    /// Create a client without credentials
    ///
    /// Every operation fails with [`Error::NotConfigured`].
    pub fn unconfigured(policy: UpdatePolicy) -> Self {
        Self { api: None, policy }
    }

    /// Whether an account is configured
    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    /// The write policy in effect
    pub fn policy(&self) -> &UpdatePolicy {
        &self.policy
    }

    fn api(&self) -> Result<&Arc<dyn DnsApi>> {
        self.api.as_ref().ok_or(Error::NotConfigured)
    }

    /// List every domain name in the account
    pub async fn list_domains(&self) -> Result<Vec<String>> {
        let api = self.api()?;
        let page_size = self.policy.page_size;

        let domains = collect_pages(api.provider_name(), |page_number| {
            api.describe_domains(page_number, page_size)
        })
        .await?;

        debug!("Listed {} domains", domains.len());
        Ok(domains)
    }

    /// List every record of `domain`
    pub async fn list_records(&self, domain: &str) -> Result<Vec<DomainRecord>> {
        let api = self.api()?;
        let page_size = self.policy.page_size;

        let records = collect_pages(api.provider_name(), |page_number| {
            let query = RecordQuery::page(domain, page_number, page_size);
            async move { api.describe_domain_records(&query).await }
        })
        .await?;

        debug!("Domain {} has {} records", domain, records.len());
        Ok(records)
    }

    /// List the records of every domain in the account
    ///
    /// A domain whose listing fails is recorded in
    /// [`RecordListing::failures`] and the remaining domains are still listed.
    pub async fn list_all_records(&self) -> Result<RecordListing> {
        let domains = self.list_domains().await?;
        let mut listing = RecordListing::default();

        for domain in domains {
            match self.list_records(&domain).await {
                Ok(records) => listing.records.extend(records),
                Err(e) => {
                    warn!("Failed to list records of {}: {}", domain, e);
                    listing.failures.push((domain, e.to_string()));
                }
            }
        }

        info!(
            "Listed {} records ({} domains failed)",
            listing.records.len(),
            listing.failures.len()
        );
        Ok(listing)
    }

    /// Current value of the record matching `rr` and `record_type` exactly
    ///
    /// The provider filters by keyword, so the page is scanned for an exact
    /// match. Returns `Ok(None)` when no such record exists.
    pub async fn get_record_value(
        &self,
        domain: &str,
        rr: &str,
        record_type: &RecordType,
    ) -> Result<Option<String>> {
        let api = self.api()?;
        let query = RecordQuery::page(domain, 1, self.policy.page_size)
            .filtered(rr, record_type.clone());

        let page = api.describe_domain_records(&query).await?;

        Ok(page
            .items
            .into_iter()
            .find(|r| r.rr == rr && &r.record_type == record_type)
            .map(|r| r.value))
    }

    /// Set a record to `value`
    ///
    /// Returns `Ok(())` without writing when the live value already matches.
    /// A duplicate-record rejection is treated as success once a re-read
    /// confirms the live value.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedType`]: `record_type` is not A or AAAA
    /// - [`Error::InvalidAddress`]: `value` does not fit the record family
    /// - [`Error::Provider`]: the write failed on every attempt
    pub async fn update_record(
        &self,
        record_id: &str,
        rr: &str,
        record_type: &RecordType,
        value: &str,
        domain: &str,
    ) -> Result<()> {
        let api = self.api()?;

        if self.get_record_value(domain, rr, record_type).await?.as_deref() == Some(value) {
            debug!(
                "{} ({}) already has value {}, no update needed",
                crate::types::fqdn(rr, domain),
                record_type,
                value
            );
            return Ok(());
        }

        let rr = normalize_rr(rr);
        let record_type = RecordType::from(record_type.as_str());
        let family = record_type
            .ip_family()
            .ok_or_else(|| Error::UnsupportedType(record_type.to_string()))?;

        let value = value.trim();
        if !ip::is_valid_for(family, value) {
            return Err(Error::InvalidAddress(value.to_string()));
        }

        let update = RecordUpdate {
            record_id: record_id.to_string(),
            rr: rr.to_string(),
            record_type: record_type.clone(),
            value: value.to_string(),
            ttl: self.policy.ttl,
            line: self.policy.line.clone(),
        };

        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            debug!(
                "Updating record {} ({} {} -> {}), attempt {}/{}",
                update.record_id,
                update.rr,
                update.record_type,
                update.value,
                attempt,
                max_attempts
            );

            match api.update_domain_record(&update).await {
                Ok(()) => {
                    info!(
                        "Updated {} ({}) -> {} on attempt {}",
                        crate::types::fqdn(rr, domain),
                        record_type,
                        value,
                        attempt
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Update attempt {}/{} failed for record {}: {}",
                        attempt, max_attempts, update.record_id, e
                    );

                    if e.is_duplicate_conflict()
                        && self.confirm_value(domain, rr, &record_type, value).await
                    {
                        info!(
                            "{} ({}) already holds {}, treating duplicate as success",
                            crate::types::fqdn(rr, domain),
                            record_type,
                            value
                        );
                        return Ok(());
                    }

                    last_error = Some(e);

                    if attempt < max_attempts {
                        tokio::time::sleep(Duration::from_secs(self.policy.retry_delay_secs)).await;
                    }
                }
            }
        }

        let message = last_error
            .map(|e| e.raw_message())
            .unwrap_or_else(|| "unknown error".to_string());
        Err(Error::provider(
            api.provider_name(),
            format!("failed to update record {record_id}: {message}"),
        ))
    }

    /// Re-read the live value after a duplicate conflict
    ///
    /// A failing read counts as "not confirmed".
    async fn confirm_value(
        &self,
        domain: &str,
        rr: &str,
        record_type: &RecordType,
        value: &str,
    ) -> bool {
        match self.get_record_value(domain, rr, record_type).await {
            Ok(live) => live.as_deref() == Some(value),
            Err(e) => {
                warn!("Re-check of {} failed: {}", crate::types::fqdn(rr, domain), e);
                false
            }
        }
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("provider", &self.api.as_ref().map(|api| api.provider_name()))
            .field("policy", &self.policy)
            .finish()
    }
}

/// Trim the host label and strip one trailing dot
fn normalize_rr(rr: &str) -> &str {
    let rr = rr.trim();
    rr.strip_suffix('.').unwrap_or(rr)
}

/// Fetch pages starting at 1 until the reported total is reached
///
/// A page that adds nothing while items are still missing is an error, so a
/// provider reporting an inconsistent total cannot loop forever.
async fn collect_pages<T, F, Fut>(provider: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page_number = 1u32;

    loop {
        let page = fetch(page_number).await?;
        let fetched = page.items.len();
        items.extend(page.items);

        if items.len() as u64 >= page.total_count {
            return Ok(items);
        }

        if fetched == 0 {
            return Err(Error::provider(
                provider,
                format!(
                    "no progress on page {page_number}: got {} of {} items",
                    items.len(),
                    page.total_count
                ),
            ));
        }

        page_number += 1;
    }
}

// # DNS API Trait
//
// Defines the transport boundary to the DNS provider.
//
// ## Implementations
//
// - Alibaba Cloud DNS: `aliddns-provider-aliyun` crate
// - In-memory fakes: `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use aliddns_core::{DnsApi, ProviderClient};
//
// let api: Arc<dyn DnsApi> = /* DnsApi implementation */;
// let client = ProviderClient::new(api, UpdatePolicy::default());
//
// let records = client.list_records("example.com").await?;
// ```

use async_trait::async_trait;

use crate::types::{DomainRecord, RecordType};

/// One page of a paginated provider listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total number of items the provider reports across all pages
    pub total_count: u64,
}

impl<T> Page<T> {
    /// Create a page
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count }
    }
}

/// Parameters of a `DescribeDomainRecords` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub domain_name: String,
    /// 1-based page number
    pub page_number: u32,
    pub page_size: u32,
    /// Host label filter (the provider matches it as a keyword, not exactly)
    pub rr_keyword: Option<String>,
    pub record_type: Option<RecordType>,
}

impl RecordQuery {
    /// Query one page of all records of a domain
    pub fn page(domain_name: impl Into<String>, page_number: u32, page_size: u32) -> Self {
        Self {
            domain_name: domain_name.into(),
            page_number,
            page_size,
            rr_keyword: None,
            record_type: None,
        }
    }

    /// Restrict to a host label and record type
    pub fn filtered(mut self, rr: impl Into<String>, record_type: RecordType) -> Self {
        self.rr_keyword = Some(rr.into());
        self.record_type = Some(record_type);
        self
    }
}

/// Parameters of an `UpdateDomainRecord` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUpdate {
    pub record_id: String,
    pub rr: String,
    pub record_type: RecordType,
    pub value: String,
    pub ttl: u32,
    /// Routing line, always `default` for this engine
    pub line: String,
}

/// Trait for DNS provider API implementations
///
/// Each method maps to exactly one provider API call. Implementations
/// authenticate, send the request and translate the response; they do not
/// paginate, retry or decide whether a write is needed. That is the job of
/// [`ProviderClient`](crate::ProviderClient).
///
/// # Errors
///
/// Transport and API failures are returned as
/// [`Error::Provider`](crate::Error::Provider). A write rejected because the
/// record already holds the value must be returned as
/// [`Error::DuplicateRecord`](crate::Error::DuplicateRecord) so the retry
/// logic can confirm it against the live value.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// List one page of domain names in the account (`DescribeDomains`)
    async fn describe_domains(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<Page<String>, crate::Error>;

    /// List one page of records of a domain (`DescribeDomainRecords`)
    async fn describe_domain_records(
        &self,
        query: &RecordQuery,
    ) -> Result<Page<DomainRecord>, crate::Error>;

    /// Overwrite a record (`UpdateDomainRecord`)
    async fn update_domain_record(&self, update: &RecordUpdate) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

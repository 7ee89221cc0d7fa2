//! Test doubles and common utilities for contract tests
//!
//! The doubles keep state in memory and count calls so tests can assert on
//! exactly how many provider requests a behavior costs.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aliddns_core::error::{Error, Result};
use aliddns_core::traits::{DnsApi, IpResolver, Page, RecordQuery, RecordUpdate};
use aliddns_core::{CurrentIps, DomainRecord, RecordType, TrackedRecord, UpdatePolicy};
use tokio::sync::Notify;
use tokio::time::Instant;

/// Scripted outcome of one `update_domain_record` call
#[derive(Debug, Clone)]
pub enum UpdateFailure {
    /// Fail with a generic provider error
    Provider(String),
    /// Apply the write, then report a duplicate conflict
    DuplicateAfterWrite,
    /// Report a duplicate conflict without touching the record
    Duplicate,
}

/// In-memory DNS provider
pub struct FakeDnsApi {
    domains: Vec<String>,
    records: Mutex<Vec<DomainRecord>>,
    update_failures: Mutex<VecDeque<UpdateFailure>>,
    failing_domains: Mutex<HashSet<String>>,
    /// Reported total overriding the real count (to simulate inconsistent totals)
    total_override: Mutex<Option<u64>>,
    fail_lookups: Mutex<bool>,
    describe_domains_calls: Arc<AtomicUsize>,
    describe_records_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
    updates: Arc<Mutex<Vec<RecordUpdate>>>,
}

impl FakeDnsApi {
    pub fn new() -> Self {
        Self {
            domains: Vec::new(),
            records: Mutex::new(Vec::new()),
            update_failures: Mutex::new(VecDeque::new()),
            failing_domains: Mutex::new(HashSet::new()),
            total_override: Mutex::new(None),
            fail_lookups: Mutex::new(false),
            describe_domains_calls: Arc::new(AtomicUsize::new(0)),
            describe_records_calls: Arc::new(AtomicUsize::new(0)),
            update_calls: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a domain to the account
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domains.push(domain.to_string());
        self
    }

    /// Add a record (its domain is added too)
    pub fn with_record(
        mut self,
        record_id: &str,
        domain: &str,
        rr: &str,
        record_type: &str,
        value: &str,
    ) -> Self {
        if !self.domains.iter().any(|d| d == domain) {
            self.domains.push(domain.to_string());
        }
        self.records.get_mut().unwrap().push(DomainRecord {
            record_id: record_id.to_string(),
            domain_name: domain.to_string(),
            rr: rr.to_string(),
            record_type: RecordType::from(record_type),
            value: value.to_string(),
            ttl: 600,
        });
        self
    }

    /// Add `count` filler TXT records to `domain`
    pub fn with_filler_records(mut self, domain: &str, count: usize) -> Self {
        for i in 0..count {
            self = self.with_record(
                &format!("fill-{i}"),
                domain,
                &format!("txt{i}"),
                "TXT",
                "v=filler",
            );
        }
        self
    }

    /// Fail the next update calls in order
    pub fn fail_updates(&self, failures: impl IntoIterator<Item = UpdateFailure>) {
        self.update_failures.lock().unwrap().extend(failures);
    }

    /// Make listing `domain` fail
    pub fn fail_domain(&self, domain: &str) {
        self.failing_domains.lock().unwrap().insert(domain.to_string());
    }

    /// Make every record lookup fail
    pub fn fail_lookups(&self) {
        *self.fail_lookups.lock().unwrap() = true;
    }

    /// Report `total` instead of the real record count
    pub fn report_total(&self, total: u64) {
        *self.total_override.lock().unwrap() = Some(total);
    }

    /// Current value of a record
    pub fn value_of(&self, record_id: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.record_id == record_id)
            .map(|r| r.value.clone())
    }

    pub fn update_call_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn describe_records_call_count(&self) -> usize {
        self.describe_records_calls.load(Ordering::SeqCst)
    }

    pub fn describe_domains_call_count(&self) -> usize {
        self.describe_domains_calls.load(Ordering::SeqCst)
    }

    /// Every update request received, in order
    pub fn updates(&self) -> Vec<RecordUpdate> {
        self.updates.lock().unwrap().clone()
    }

    fn apply(&self, update: &RecordUpdate) {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.record_id == update.record_id) {
            record.rr = update.rr.clone();
            record.record_type = update.record_type.clone();
            record.value = update.value.clone();
            record.ttl = update.ttl;
        }
    }
}

fn paginate<T: Clone>(items: &[T], page_number: u32, page_size: u32) -> Vec<T> {
    let start = (page_number.saturating_sub(1) as usize) * page_size as usize;
    items.iter().skip(start).take(page_size as usize).cloned().collect()
}

#[async_trait::async_trait]
impl DnsApi for FakeDnsApi {
    async fn describe_domains(&self, page_number: u32, page_size: u32) -> Result<Page<String>> {
        self.describe_domains_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Page::new(
            paginate(&self.domains, page_number, page_size),
            self.domains.len() as u64,
        ))
    }

    async fn describe_domain_records(&self, query: &RecordQuery) -> Result<Page<DomainRecord>> {
        self.describe_records_calls.fetch_add(1, Ordering::SeqCst);

        if *self.fail_lookups.lock().unwrap()
            || self.failing_domains.lock().unwrap().contains(&query.domain_name)
        {
            return Err(Error::provider("fake", "InternalError: lookup failed"));
        }

        let matching: Vec<DomainRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.domain_name == query.domain_name)
            .filter(|r| query.rr_keyword.as_ref().is_none_or(|k| r.rr.contains(k.as_str())))
            .filter(|r| query.record_type.as_ref().is_none_or(|t| &r.record_type == t))
            .cloned()
            .collect();

        let total = self
            .total_override
            .lock()
            .unwrap()
            .unwrap_or(matching.len() as u64);

        Ok(Page::new(
            paginate(&matching, query.page_number, query.page_size),
            total,
        ))
    }

    async fn update_domain_record(&self, update: &RecordUpdate) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.updates.lock().unwrap().push(update.clone());

        let failure = self.update_failures.lock().unwrap().pop_front();
        match failure {
            None => {
                self.apply(update);
                Ok(())
            }
            Some(UpdateFailure::Provider(message)) => Err(Error::provider("fake", message)),
            Some(UpdateFailure::DuplicateAfterWrite) => {
                self.apply(update);
                Err(Error::duplicate("The DNS record already exists."))
            }
            Some(UpdateFailure::Duplicate) => {
                Err(Error::duplicate("The DNS record already exists."))
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Resolver returning fixed addresses
pub struct FixedResolver {
    ips: CurrentIps,
    calls: Arc<AtomicUsize>,
}

impl FixedResolver {
    pub fn new(ipv4: Option<&str>, ipv6: Option<&str>) -> Self {
        Self {
            ips: CurrentIps::new(ipv4.map(String::from), ipv6.map(String::from)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpResolver for FixedResolver {
    async fn resolve(&self) -> CurrentIps {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ips.clone()
    }
}

/// Resolver that blocks each call until released
pub struct GatedResolver {
    ips: CurrentIps,
    release: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

impl GatedResolver {
    pub fn new(ipv4: &str) -> Self {
        Self {
            ips: CurrentIps::new(Some(ipv4.to_string()), None),
            release: Arc::new(Notify::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Let one blocked (or the next) call return
    pub fn release_one(&self) {
        self.release.notify_one();
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpResolver for GatedResolver {
    async fn resolve(&self) -> CurrentIps {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        self.ips.clone()
    }
}

/// Resolver that takes `delay` to answer and records when each call started
pub struct SlowResolver {
    ips: CurrentIps,
    delay: Duration,
    started: Mutex<Vec<Instant>>,
}

impl SlowResolver {
    pub fn new(ipv4: &str, delay: Duration) -> Self {
        Self {
            ips: CurrentIps::new(Some(ipv4.to_string()), None),
            delay,
            started: Mutex::new(Vec::new()),
        }
    }

    /// Start instants of every call so far
    pub fn call_starts(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IpResolver for SlowResolver {
    async fn resolve(&self) -> CurrentIps {
        self.started.lock().unwrap().push(Instant::now());
        tokio::time::sleep(self.delay).await;
        self.ips.clone()
    }
}

/// Default policy without retry delays
pub fn fast_policy() -> UpdatePolicy {
    UpdatePolicy::default().without_delay()
}

/// `home.example.com` A record with id `1`
pub fn home_a() -> TrackedRecord {
    TrackedRecord::new("1", "example.com", "home", "A")
}

//! Domain types shared by the resolver, provider client and sync engine

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ip::IpFamily;

/// DNS record type
///
/// Parsing is case-insensitive; the canonical form is upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ns,
    Srv,
    Caa,
    /// Any other type reported by the provider, stored upper-cased
    Other(String),
}

impl RecordType {
    /// Canonical upper-case name
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
            RecordType::Other(name) => name,
        }
    }

    /// Address family for A/AAAA, `None` for everything else
    pub fn ip_family(&self) -> Option<IpFamily> {
        match self {
            RecordType::A => Some(IpFamily::V4),
            RecordType::Aaaa => Some(IpFamily::V6),
            _ => None,
        }
    }

    /// Whether the engine keeps this type in sync
    pub fn is_address(&self) -> bool {
        self.ip_family().is_some()
    }
}

impl From<&str> for RecordType {
    fn from(value: &str) -> Self {
        let upper = value.trim().to_uppercase();
        match upper.as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "MX" => RecordType::Mx,
            "TXT" => RecordType::Txt,
            "NS" => RecordType::Ns,
            "SRV" => RecordType::Srv,
            "CAA" => RecordType::Caa,
            _ => RecordType::Other(upper),
        }
    }
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        RecordType::from(value.as_str())
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render `rr` + `domain` as a host name, `@` meaning the bare domain
pub fn fqdn(rr: &str, domain: &str) -> String {
    if rr == "@" || rr.is_empty() {
        domain.to_string()
    } else {
        format!("{rr}.{domain}")
    }
}

/// A DNS record as listed by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// Provider identifier, stable across updates
    pub record_id: String,
    pub domain_name: String,
    /// Host label, `@` for the bare domain
    pub rr: String,
    pub record_type: RecordType,
    /// Current textual value
    pub value: String,
    pub ttl: u32,
}

impl DomainRecord {
    /// Host name of this record
    pub fn fqdn(&self) -> String {
        fqdn(&self.rr, &self.domain_name)
    }
}

/// A record selected for synchronization
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackedRecord {
    #[serde(alias = "RecordId")]
    pub record_id: String,
    #[serde(alias = "DomainName")]
    pub domain_name: String,
    #[serde(alias = "RR")]
    pub rr: String,
    #[serde(alias = "Type")]
    pub record_type: RecordType,
}

impl TrackedRecord {
    /// Create a tracked record
    pub fn new(
        record_id: impl Into<String>,
        domain_name: impl Into<String>,
        rr: impl Into<String>,
        record_type: impl Into<RecordType>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            domain_name: domain_name.into(),
            rr: rr.into(),
            record_type: record_type.into(),
        }
    }

    /// Host name of this record
    pub fn fqdn(&self) -> String {
        fqdn(&self.rr, &self.domain_name)
    }

    /// Stable key used by state stores, e.g. `home.example.com/A`
    pub fn key(&self) -> String {
        format!("{}/{}", self.fqdn(), self.record_type)
    }
}

impl From<&DomainRecord> for TrackedRecord {
    fn from(record: &DomainRecord) -> Self {
        Self {
            record_id: record.record_id.clone(),
            domain_name: record.domain_name.clone(),
            rr: record.rr.clone(),
            record_type: record.record_type.clone(),
        }
    }
}

/// Public addresses observed in one sync cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentIps {
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

impl CurrentIps {
    /// Create from already-validated addresses
    pub fn new(ipv4: Option<String>, ipv6: Option<String>) -> Self {
        Self { ipv4, ipv6 }
    }

    /// Neither family resolved
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_none() && self.ipv6.is_none()
    }

    /// Address for the given family
    pub fn for_family(&self, family: IpFamily) -> Option<&str> {
        match family {
            IpFamily::V4 => self.ipv4.as_deref(),
            IpFamily::V6 => self.ipv6.as_deref(),
        }
    }
}

impl fmt::Display for CurrentIps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.ipv4, &self.ipv6) {
            (Some(v4), Some(v6)) => write!(f, "IPv4: {v4} | IPv6: {v6}"),
            (Some(v4), None) => write!(f, "IPv4: {v4}"),
            (None, Some(v6)) => write!(f, "IPv6: {v6}"),
            (None, None) => f.write_str("no address"),
        }
    }
}

/// Outcome of processing one tracked record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Skipped,
    Error,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Success => f.write_str("success"),
            SyncStatus::Skipped => f.write_str("skipped"),
            SyncStatus::Error => f.write_str("error"),
        }
    }
}

/// Result for one tracked record in one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub domain: String,
    pub rr: String,
    pub record_type: RecordType,
    /// Live value before the cycle, absent when skipped before lookup
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub status: SyncStatus,
    /// Human-readable reason
    pub message: String,
}

impl SyncResult {
    fn for_record(record: &TrackedRecord, status: SyncStatus, message: String) -> Self {
        Self {
            domain: record.domain_name.clone(),
            rr: record.rr.clone(),
            record_type: record.record_type.clone(),
            old_value: None,
            new_value: None,
            status,
            message,
        }
    }

    /// Record skipped before any lookup
    pub fn skipped(record: &TrackedRecord, message: impl Into<String>) -> Self {
        Self::for_record(record, SyncStatus::Skipped, message.into())
    }

    /// Record failed
    pub fn error(record: &TrackedRecord, message: impl Into<String>) -> Self {
        Self::for_record(record, SyncStatus::Error, message.into())
    }

    /// Attach the observed and target values
    pub fn with_values(mut self, old_value: Option<String>, new_value: Option<String>) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    /// Record updated from `old_value` to `new_value`
    pub fn success(record: &TrackedRecord, old_value: Option<String>, new_value: &str) -> Self {
        Self::for_record(
            record,
            SyncStatus::Success,
            format!("updated {} -> {}", record.fqdn(), new_value),
        )
        .with_values(old_value, Some(new_value.to_string()))
    }

    /// Host name of the record this result describes
    pub fn fqdn(&self) -> String {
        fqdn(&self.rr, &self.domain)
    }

    /// Same key as [`TrackedRecord::key`]
    pub fn key(&self) -> String {
        format!("{}/{}", self.fqdn(), self.record_type)
    }
}

/// Per-status counts for a finished cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub success: usize,
    pub skipped: usize,
    pub error: usize,
}

impl SyncSummary {
    /// Total number of records processed
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.error
    }
}

impl From<&[SyncResult]> for SyncSummary {
    fn from(results: &[SyncResult]) -> Self {
        results
            .iter()
            .fold(SyncSummary::default(), |mut summary, result| {
                match result.status {
                    SyncStatus::Success => summary.success += 1,
                    SyncStatus::Skipped => summary.skipped += 1,
                    SyncStatus::Error => summary.error += 1,
                }
                summary
            })
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "success: {}, skipped: {}, error: {}",
            self.success, self.skipped, self.error
        )
    }
}

//! Configuration types for the aliddns system
//!
//! This module defines all configuration structures used throughout the crate.
//! How a configuration is loaded or saved is up to the caller; the engine
//! only consumes an immutable snapshot.

use serde::{Deserialize, Serialize};

use crate::types::TrackedRecord;

/// Default Alidns region
pub const DEFAULT_REGION: &str = "cn-hangzhou";

/// Default IPv4-only lookup endpoint
pub const DEFAULT_IPV4_URL: &str = "http://4.ipw.cn";

/// Default IPv6-capable lookup endpoint
pub const DEFAULT_IPV6_URL: &str = "http://6.ipw.cn";

/// Browser-like User-Agent; some lookup endpoints reject anything else
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Largest page the provider accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Main aliddns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Provider credentials; `None` means "not configured"
    #[serde(default)]
    pub credentials: Option<Credentials>,

    /// Records kept in sync (`sync_records` in flat documents)
    #[serde(default, alias = "sync_records")]
    pub tracked_records: Vec<TrackedRecord>,

    /// Seconds between periodic sync cycles
    #[serde(default = "default_check_interval_secs", alias = "check_interval")]
    pub check_interval_secs: u64,

    /// Seconds before the first cycle after startup
    #[serde(default)]
    pub startup_delay_secs: u64,

    /// Public IP discovery settings
    #[serde(default)]
    pub ip_lookup: IpLookupConfig,

    /// Provider write settings
    #[serde(default)]
    pub update: UpdatePolicy,

    /// Capacity of the scheduler event channel
    ///
    /// When full, new cycle events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl DdnsConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            credentials: None,
            tracked_records: Vec::new(),
            check_interval_secs: default_check_interval_secs(),
            startup_delay_secs: 0,
            ip_lookup: IpLookupConfig::default(),
            update: UpdatePolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Parse a JSON configuration document
    ///
    /// Besides the nested `credentials` section, the flat layout written by
    /// the desktop client is accepted: top-level `access_key_id` /
    /// `access_key_secret`, `check_interval` and `sync_records` entries with
    /// `RecordId`/`DomainName`/`RR`/`Type` keys. Empty flat keys mean
    /// "not configured".
    pub fn from_json_str(json: &str) -> Result<Self, crate::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let mut config: Self = serde_json::from_value(value.clone())?;

        if config.credentials.is_none() {
            let flat: FlatCredentials = serde_json::from_value(value)?;
            config.credentials = flat.into_credentials();
        }

        Ok(config)
    }

    /// Whether credentials are present
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Validate the configuration
    ///
    /// Missing credentials and an empty record list are both valid states.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.check_interval_secs == 0 {
            return Err(crate::Error::config("check_interval_secs must be > 0"));
        }

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }

        if let Some(credentials) = &self.credentials {
            credentials.validate()?;
        }

        for record in &self.tracked_records {
            if record.record_id.trim().is_empty() {
                return Err(crate::Error::config(format!(
                    "Tracked record {} has an empty record_id",
                    record.fqdn()
                )));
            }
            if record.domain_name.trim().is_empty() {
                return Err(crate::Error::config(format!(
                    "Tracked record {} has an empty domain_name",
                    record.record_id
                )));
            }
        }

        self.ip_lookup.validate()?;
        self.update.validate()?;

        Ok(())
    }
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Credentials stored at the top level of a flat configuration document
#[derive(Deserialize)]
struct FlatCredentials {
    #[serde(default)]
    access_key_id: String,
    #[serde(default)]
    access_key_secret: String,
    #[serde(default)]
    region: Option<String>,
}

impl FlatCredentials {
    fn into_credentials(self) -> Option<Credentials> {
        if self.access_key_id.trim().is_empty() && self.access_key_secret.trim().is_empty() {
            return None;
        }
        Some(Credentials {
            access_key_id: self.access_key_id,
            access_key_secret: self.access_key_secret,
            region: self.region.unwrap_or_else(default_region),
        })
    }
}

/// Access key credentials for the DNS provider
///
/// The Debug implementation intentionally does NOT expose the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    /// ⚠️ NEVER log this value
    pub access_key_secret: String,
    #[serde(default = "default_region")]
    pub region: String,
}

impl Credentials {
    /// Create credentials for the default region
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            region: default_region(),
        }
    }

    /// Override the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Validate that no field is blank
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.access_key_id.trim().is_empty() {
            return Err(crate::Error::config("access_key_id cannot be empty"));
        }
        if self.access_key_secret.trim().is_empty() {
            return Err(crate::Error::config("access_key_secret cannot be empty"));
        }
        if self.region.trim().is_empty() {
            return Err(crate::Error::config("region cannot be empty"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field("region", &self.region)
            .finish()
    }
}

/// Public IP discovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpLookupConfig {
    /// Endpoint returning the IPv4 address as plain text
    #[serde(default = "default_ipv4_url")]
    pub ipv4_url: String,

    /// Endpoint returning the IPv6 address as plain text
    #[serde(default = "default_ipv6_url")]
    pub ipv6_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent to the endpoints
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl IpLookupConfig {
    /// Validate the lookup configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ipv4_url.is_empty() || self.ipv6_url.is_empty() {
            return Err(crate::Error::config("IP lookup URLs cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("IP lookup timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for IpLookupConfig {
    fn default() -> Self {
        Self {
            ipv4_url: default_ipv4_url(),
            ipv6_url: default_ipv6_url(),
            timeout_secs: default_lookup_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Provider write and listing policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePolicy {
    /// Total write attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between write attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// TTL written with every update
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Routing line written with every update
    #[serde(default = "default_line")]
    pub line: String,

    /// Page size for record listings
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl UpdatePolicy {
    /// Same policy without any delay between attempts
    pub fn without_delay(mut self) -> Self {
        self.retry_delay_secs = 0;
        self
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 {
            return Err(crate::Error::config("max_attempts must be >= 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(crate::Error::config(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.line.is_empty() {
            return Err(crate::Error::config("line cannot be empty"));
        }
        Ok(())
    }
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            ttl: default_ttl(),
            line: default_line(),
            page_size: default_page_size(),
        }
    }
}

fn default_check_interval_secs() -> u64 {
    300
}

fn default_event_channel_capacity() -> usize {
    64
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_ipv4_url() -> String {
    DEFAULT_IPV4_URL.to_string()
}

fn default_ipv6_url() -> String {
    DEFAULT_IPV6_URL.to_string()
}

fn default_lookup_timeout_secs() -> u64 {
    5
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_ttl() -> u32 {
    600
}

fn default_line() -> String {
    "default".to_string()
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

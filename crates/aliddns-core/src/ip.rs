//! Textual IP address validation
//!
//! Addresses are handled as the literal strings the provider stores, so
//! validation is a pattern match rather than a parse into `std::net` types.
//! The IPv6 pattern only accepts the full eight-group form; the `::`
//! compressed notation is rejected on purpose and such hosts are treated as
//! having no IPv6 address.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static IPV4_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").expect("valid IPv4 pattern"));

static IPV6_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}$").expect("valid IPv6 pattern")
});

/// Address family of a record or a resolved address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    /// IPv4 (A records)
    V4,
    /// IPv6 (AAAA records)
    V6,
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("IPv4"),
            IpFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Four dot-separated decimal octets, each in `0..=255`
pub fn is_valid_ipv4(value: &str) -> bool {
    IPV4_PATTERN.is_match(value) && value.split('.').all(|octet| octet.parse::<u8>().is_ok())
}

/// Eight colon-separated groups of one to four hex digits
pub fn is_valid_ipv6(value: &str) -> bool {
    IPV6_PATTERN.is_match(value)
}

/// Validate `value` against the pattern for `family`
pub fn is_valid_for(family: IpFamily, value: &str) -> bool {
    match family {
        IpFamily::V4 => is_valid_ipv4(value),
        IpFamily::V6 => is_valid_ipv6(value),
    }
}

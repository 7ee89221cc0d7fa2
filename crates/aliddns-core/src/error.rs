//! Error types for the aliddns system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for aliddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Provider error code signalling that the written value already exists
pub const DUPLICATE_RECORD_CODE: &str = "DomainRecordDuplicate";

/// Core error type for the aliddns system
#[derive(Error, Debug)]
pub enum Error {
    /// No credentials configured (expected initial state)
    #[error("DNS provider account is not configured")]
    NotConfigured,

    /// Transport or API failure reported by the DNS provider
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Raw provider message
        message: String,
    },

    /// The provider rejected a write because an identical record already exists
    ///
    /// Only meaningful inside the update retry loop, which re-checks the live
    /// value before deciding whether this is a failure.
    #[error("Duplicate record: {message}")]
    DuplicateRecord {
        /// Raw provider message
        message: String,
    },

    /// Record type that the engine never writes
    #[error("Unsupported record type: {0}")]
    UnsupportedType(String),

    /// Value does not match the address pattern for its record type
    #[error("Invalid IP address format: {0}")]
    InvalidAddress(String),

    /// Neither an IPv4 nor an IPv6 address could be resolved
    #[error("Could not obtain any public IP address")]
    NoAddressAvailable,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate-record conflict error
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::DuplicateRecord {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Whether this error signals a duplicate-record conflict
    ///
    /// Providers that cannot classify their errors may still carry the
    /// conflict code inside a generic message, so both forms are accepted.
    pub fn is_duplicate_conflict(&self) -> bool {
        match self {
            Self::DuplicateRecord { .. } => true,
            Self::Provider { message, .. } => message.contains(DUPLICATE_RECORD_CODE),
            _ => false,
        }
    }

    /// The raw message without the variant prefix
    pub fn raw_message(&self) -> String {
        match self {
            Self::Provider { message, .. } | Self::DuplicateRecord { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

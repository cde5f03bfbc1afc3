//! Error types for pageimg
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Database, Fetch, CacheStore, etc.)
//! - Machine-readable error codes for structured log records
//! - Context information (URL, store name, failure reason)

use thiserror::Error;

/// Result type alias for pageimg operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pageimg
///
/// Every failure the loader meets while resolving a unit is one of these.
/// Failures never cross unit boundaries: the loader turns them into an
/// invalid progress report and moves on.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "cache.ttl")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// A remote fetch was rejected or its body could not be read
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// The URL being fetched
        url: String,
        /// The reason the fetch failed
        reason: String,
    },

    /// The resource cache store is unavailable or rejected an operation
    #[error("cache store error: {0}")]
    CacheStore(String),

    /// Natively loaded content decoded to nothing (zero-area image)
    #[error("decode failed for element {0}: zero-area content")]
    Decode(String),

    /// A marker URL could not be parsed or resolved to an absolute URL
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL text
        url: String,
        /// Parser message
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Coarse failure classes a unit can end invalid with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Remote request rejected or transport error
    Network,
    /// Cache store unavailable or threw
    CacheStore,
    /// Native load finished with zero-area content
    Decode,
    /// Anything else (bad configuration, bad URL, serialization)
    Other,
}

impl Error {
    /// Classify this error into the loader's failure taxonomy
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::Fetch { .. } => FailureKind::Network,
            Error::CacheStore(_) | Error::Database(_) => FailureKind::CacheStore,
            Error::Decode(_) => FailureKind::Decode,
            Error::Config { .. }
            | Error::InvalidUrl { .. }
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Other(_) => FailureKind::Other,
        }
    }

    /// Machine-readable error code, used as a structured log field
    pub fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Fetch { .. } => "fetch_failed",
            Error::CacheStore(_) => "cache_store_error",
            Error::Decode(_) => "decode_failed",
            Error::InvalidUrl { .. } => "invalid_url",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }
}

//! Error types for cache operations
//!
//! This module defines custom error types for the strata-cache library.
//! Errors exist for the internal seams (backend contract, configuration,
//! construction); the public verb surface converts them into plain
//! `false` / `None` results so that callers can never tell a failure
//! from an ordinary miss.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Storage key rejected by validation (empty, too long, or embedded NUL)
    #[error("Invalid cache key `{key}`: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Backend unreachable or an operation failed inside the backend
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Requested backend identifier has no registered factory
    #[error("Unknown backend `{0}`")]
    UnknownBackend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}

//! Error types for Stampede.
//!
//! This module provides the error hierarchy using `thiserror`.
//! Producer failures appear here only so they can be logged; the fetch path
//! never returns them to the caller.

use thiserror::Error;

/// Result type alias using `StampedeError`.
pub type Result<T> = std::result::Result<T, StampedeError>;

/// Main error type for all Stampede operations.
#[derive(Debug, Error)]
pub enum StampedeError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Cache entry constructed without a usable key seed.
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Producer registration with something that cannot be invoked.
    #[error("Un-callable producer: {0}")]
    UncallableProducer(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // RUNTIME ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The producer returned an error or panicked.
    #[error("Producer failed: {0}")]
    ProducerFailure(String),

    /// The backing store rejected an operation.
    #[error("Store error: {0}")]
    Store(String),

    /// The backing store lacks an optional capability.
    #[error("Unsupported store operation: {0}")]
    Unsupported(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StampedeError {
    /// Returns true if this error was raised while configuring a cache entry.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            StampedeError::InvalidKey(_)
                | StampedeError::UncallableProducer(_)
                | StampedeError::Config(_)
        )
    }

    /// Returns true if retrying the same call later may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StampedeError::Store(_) | StampedeError::ProducerFailure(_)
        )
    }
}

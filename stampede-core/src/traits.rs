//! Common traits for Stampede.
//!
//! These traits define the collaborators the host environment supplies,
//! enabling different backends and simulated time in tests.

use crate::error::{Result, StampedeError};

// ═══════════════════════════════════════════════════════════════════════════════
// STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Key-value storage with per-entry TTL.
///
/// Implementations must make each single-key operation atomic. No cross-key
/// transactions are required.
///
/// Implementations might use:
/// - In-memory maps (for testing/single-process deployments)
/// - Redis/Memcached (for shared deployments)
/// - A database table with an expiry column
pub trait Store: Send + Sync {
    /// Reads the value stored under `key`, or `None` if absent or expired.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// A `ttl_seconds` of 0 stores the value indefinitely (or per host default).
    fn write(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Writes `value` only if `key` is absent, atomically.
    ///
    /// Returns `true` if the value was written, `false` if the key was held.
    fn write_if_absent(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<bool> {
        let _ = (value, ttl_seconds);
        Err(StampedeError::Unsupported(format!(
            "atomic create-if-absent for '{key}'"
        )))
    }

    /// Returns true if [`Store::write_if_absent`] is implemented atomically.
    fn supports_atomic_create(&self) -> bool {
        false
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of wall-clock time, in whole seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// Returns the current time in seconds since the Unix epoch.
    fn now(&self) -> i64;
}

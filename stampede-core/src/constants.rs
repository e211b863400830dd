//! Constants for Stampede.
//!
//! Store namespaces and key sizes are part of the on-store format: changing
//! any of them orphans every entry written by a previous build.

// ═══════════════════════════════════════════════════════════════════════════════
// STORE NAMESPACES
// ═══════════════════════════════════════════════════════════════════════════════

/// Prefix prepended to every derived cache key.
///
/// Keeps cache entries from colliding with unrelated entries in a shared store.
pub const KEY_PREFIX: &str = "transient_";

/// Prefix prepended to a cache key to form its lock entry key.
pub const LOCK_PREFIX: &str = "lock_";

// ═══════════════════════════════════════════════════════════════════════════════
// KEY DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Number of digest bytes kept from the seed hash.
pub const KEY_DIGEST_SIZE: usize = 16;

/// Length of the hex-encoded digest part of a cache key.
pub const KEY_DIGEST_HEX_LEN: usize = KEY_DIGEST_SIZE * 2;

/// Domain separator for cache key derivation.
pub const DOMAIN_CACHE_KEY: &[u8] = b"STAMPEDE_CACHE_KEY_V1";

// ═══════════════════════════════════════════════════════════════════════════════
// DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default cache lifetime in seconds (10 minutes).
pub const DEFAULT_TTL_SECS: u64 = 600;

/// Default maximum age, in seconds, before a lock is considered abandoned.
///
/// Must exceed the slowest expected producer, otherwise in-flight
/// regenerations get reclaimed and duplicated.
pub const DEFAULT_MAX_LOCK_DURATION_SECS: u64 = 100;

/// TTL passed to the store for lock entries (no expiry of their own).
pub const LOCK_ENTRY_TTL_SECS: u64 = 0;

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Environment variable overriding the maximum lock duration.
pub const ENV_MAX_LOCK_DURATION: &str = "STAMPEDE_MAX_LOCK_DURATION";

/// Environment variable overriding the default cache lifetime.
pub const ENV_DEFAULT_TTL: &str = "STAMPEDE_DEFAULT_TTL";

/// Environment variable selecting the lock mode (`advisory` or `exclusive`).
pub const ENV_LOCK_MODE: &str = "STAMPEDE_LOCK_MODE";

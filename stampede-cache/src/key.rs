//! Cache key derivation.
//!
//! A cache key is a namespaced, fixed-length digest of a caller-supplied seed:
//!
//! ```text
//! key  = KEY_PREFIX || hex(SHAKE256(len(domain) || domain || seed, 16))
//! lock = LOCK_PREFIX || key
//! ```
//!
//! Hashing makes arbitrary seeds (URLs, query strings) safe to use as store
//! keys and bounds their length.

use std::fmt;

use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};

use stampede_core::constants::{DOMAIN_CACHE_KEY, KEY_DIGEST_SIZE, KEY_PREFIX, LOCK_PREFIX};
use stampede_core::error::{Result, StampedeError};

/// Namespaced identifier of a cache entry in the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the cache key for `seed`.
    ///
    /// Fails with [`StampedeError::InvalidKey`] if the seed is empty.
    pub fn derive(seed: &str) -> Result<Self> {
        if seed.is_empty() {
            return Err(StampedeError::InvalidKey(
                "cache entry initialized without a key seed".into(),
            ));
        }

        let mut hasher = Shake256::default();
        hasher.update(&(DOMAIN_CACHE_KEY.len() as u32).to_le_bytes());
        hasher.update(DOMAIN_CACHE_KEY);
        hasher.update(seed.as_bytes());

        let mut digest = [0u8; KEY_DIGEST_SIZE];
        hasher.finalize_xof().read(&mut digest);

        Ok(Self(format!("{}{}", KEY_PREFIX, hex::encode(digest))))
    }

    /// Returns the key as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key of the lock entry guarding this cache entry.
    pub fn lock_key(&self) -> String {
        format!("{}{}", LOCK_PREFIX, self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

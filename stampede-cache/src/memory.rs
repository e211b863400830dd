//! In-memory TTL store.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

use stampede_core::error::Result;
use stampede_core::traits::{Clock, Store};

use crate::clock::SystemClock;

/// Stored value with its expiry.
#[derive(Clone, Debug)]
struct StoredEntry {
    value: Vec<u8>,
    /// Absolute expiry in clock seconds; `None` lives forever.
    expires_at: Option<i64>,
}

impl StoredEntry {
    fn new(value: &[u8], ttl_seconds: u64, now: i64) -> Self {
        let expires_at = if ttl_seconds == 0 {
            None
        } else {
            Some(now.saturating_add(i64::try_from(ttl_seconds).unwrap_or(i64::MAX)))
        };
        Self {
            value: value.to_vec(),
            expires_at,
        }
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Thread-safe in-process [`Store`].
///
/// Expiry is checked against the injected [`Clock`] on every read, so tests
/// can age entries with a [`ManualClock`](crate::ManualClock).
/// `write_if_absent` is atomic per key, which makes this store usable with
/// [`LockMode::Exclusive`](stampede_core::LockMode::Exclusive).
pub struct MemoryStore {
    entries: DashMap<String, StoredEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Creates an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store on a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Clears all stored entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Removes all expired entries.
    pub fn cleanup_expired(&self) {
        let now = self.clock.now();
        self.entries.retain(|_, e| !e.is_expired(now));
    }

    /// Returns the number of stored entries, including expired ones not yet cleaned up.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if `key` holds a live value.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries.get(key).is_some_and(|e| !e.is_expired(now))
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        let now = self.clock.now();
        let expired = self.entries.iter().filter(|e| e.is_expired(now)).count();
        let total = self.entries.len();
        StoreStats {
            total_entries: total,
            expired_entries: expired,
            valid_entries: total.saturating_sub(expired),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = self.clock.now();
        // Expired entries are dropped lazily, but only if still expired under the write lock.
        let expired = match self.entries.get(key) {
            Some(e) if !e.is_expired(now) => return Ok(Some(e.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            trace!(key, "Dropped expired entry");
        }
        Ok(None)
    }

    fn write(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<()> {
        let entry = StoredEntry::new(value, ttl_seconds, self.clock.now());
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn write_if_absent(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<bool> {
        let now = self.clock.now();
        let fresh = StoredEntry::new(value, ttl_seconds, now);
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(fresh);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    fn supports_atomic_create(&self) -> bool {
        true
    }
}

/// Store statistics.
#[derive(Clone, Debug)]
pub struct StoreStats {
    /// Total entries (including expired)
    pub total_entries: usize,
    /// Expired entries
    pub expired_entries: usize,
    /// Valid (non-expired) entries
    pub valid_entries: usize,
}

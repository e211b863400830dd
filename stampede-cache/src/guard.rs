//! Stampede guard: the per-key regeneration lock.
//!
//! The lock is a secondary store entry, `lock_<cache key>`, whose value is the
//! acquisition time in seconds since the epoch (decimal ASCII). It has no TTL
//! of its own; instead a lock older than the maximum lock duration is treated
//! as abandoned by a crashed or hung producer and may be reclaimed.
//!
//! # Races
//!
//! In [`LockMode::Advisory`] the lock is a plain overwrite. Two callers can
//! both observe "unlocked" before either writes, and both regenerate (last
//! write wins). [`LockMode::Exclusive`] closes that window by using the
//! store's atomic create-if-absent.

use std::sync::Arc;

use tracing::{debug, warn};

use stampede_core::constants::LOCK_ENTRY_TTL_SECS;
use stampede_core::error::{Result, StampedeError};
use stampede_core::traits::{Clock, Store};
use stampede_core::types::{LockMode, LockOutcome};

use crate::key::CacheKey;

/// Creates, inspects, and reclaims lock entries.
#[derive(Clone)]
pub struct StampedeGuard {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    mode: LockMode,
}

impl StampedeGuard {
    /// Creates a guard over `store`.
    ///
    /// Fails with [`StampedeError::Config`] if `mode` is exclusive and the
    /// store cannot create entries atomically.
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, mode: LockMode) -> Result<Self> {
        if mode == LockMode::Exclusive && !store.supports_atomic_create() {
            return Err(StampedeError::Config(
                "exclusive lock mode requires a store with atomic create-if-absent".into(),
            ));
        }
        Ok(Self { store, clock, mode })
    }

    /// Returns the lock mode.
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Returns true iff a lock entry exists for `key`.
    pub fn is_locked(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.store.read(&key.lock_key())?.is_some())
    }

    /// Returns when the lock on `key` was taken, if it is locked.
    ///
    /// A lock value that is not a timestamp reads as 0, so it is always stale.
    pub fn lock_timestamp(&self, key: &CacheKey) -> Result<Option<i64>> {
        let Some(raw) = self.store.read(&key.lock_key())? else {
            return Ok(None);
        };
        let timestamp = std::str::from_utf8(&raw)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or_else(|| {
                warn!(key = %key, "Unreadable lock timestamp, treating as stale");
                0
            });
        Ok(Some(timestamp))
    }

    /// Marks `key` as being regenerated, stamped with the current time.
    ///
    /// Advisory mode overwrites any existing lock and always acquires.
    /// Exclusive mode reports [`LockOutcome::AlreadyHeld`] instead.
    pub fn acquire(&self, key: &CacheKey) -> Result<LockOutcome> {
        let stamp = self.clock.now().to_string();
        let lock_key = key.lock_key();

        let outcome = match self.mode {
            LockMode::Advisory => {
                self.store.write(&lock_key, stamp.as_bytes(), LOCK_ENTRY_TTL_SECS)?;
                LockOutcome::Acquired
            }
            LockMode::Exclusive => {
                if self
                    .store
                    .write_if_absent(&lock_key, stamp.as_bytes(), LOCK_ENTRY_TTL_SECS)?
                {
                    LockOutcome::Acquired
                } else {
                    LockOutcome::AlreadyHeld
                }
            }
        };

        debug!(key = %key, mode = %self.mode, ?outcome, "Lock acquisition");
        Ok(outcome)
    }

    /// Removes the lock on `key`. Releasing an unlocked key is a no-op.
    pub fn release(&self, key: &CacheKey) -> Result<()> {
        self.store.delete(&key.lock_key())
    }

    /// Releases the lock on `key` if it is at least `max_duration_secs` old.
    ///
    /// Returns `true` if it is now safe to regenerate: the key was not locked,
    /// or its lock was stale and has been removed.
    pub fn reclaim_if_stale(&self, key: &CacheKey, max_duration_secs: u64) -> Result<bool> {
        let Some(locked_at) = self.lock_timestamp(key)? else {
            return Ok(true);
        };

        let age = self.clock.now().saturating_sub(locked_at);
        let max = i64::try_from(max_duration_secs).unwrap_or(i64::MAX);
        if age >= max {
            warn!(key = %key, age, max_duration_secs, "Reclaiming stale lock");
            self.release(key)?;
            return Ok(true);
        }

        debug!(key = %key, age, max_duration_secs, "Lock is held and fresh");
        Ok(false)
    }
}

//! Lock acquisition modes and outcomes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StampedeError;

/// How the stampede lock is written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Plain overwrite. Two callers can both see "unlocked" and both
    /// regenerate; the lock is only a hint.
    #[default]
    Advisory,
    /// Atomic create-if-absent. Requires
    /// [`Store::supports_atomic_create`](crate::Store::supports_atomic_create).
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Advisory => f.write_str("advisory"),
            LockMode::Exclusive => f.write_str("exclusive"),
        }
    }
}

impl FromStr for LockMode {
    type Err = StampedeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "advisory" => Ok(LockMode::Advisory),
            "exclusive" => Ok(LockMode::Exclusive),
            other => Err(StampedeError::Config(format!("unknown lock mode '{other}'"))),
        }
    }
}

/// Result of an attempt to take the stampede lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockOutcome {
    /// The lock entry now carries this caller's timestamp.
    Acquired,
    /// Exclusive mode only: someone else's lock entry was already present.
    AlreadyHeld,
}

impl LockOutcome {
    /// Returns true if the lock was taken.
    pub fn is_acquired(&self) -> bool {
        matches!(self, LockOutcome::Acquired)
    }
}

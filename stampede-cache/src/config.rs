//! Cache configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

use stampede_core::constants::{
    DEFAULT_MAX_LOCK_DURATION_SECS, DEFAULT_TTL_SECS, ENV_DEFAULT_TTL, ENV_LOCK_MODE,
    ENV_MAX_LOCK_DURATION,
};
use stampede_core::types::LockMode;

/// Settings shared by cache entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransientConfig {
    /// Age in seconds after which a lock is presumed abandoned
    pub max_lock_duration_secs: u64,
    /// Lifetime of cached values until `expires_in` is called
    pub default_ttl_secs: u64,
    /// How the stampede lock is acquired
    pub lock_mode: LockMode,
}

impl Default for TransientConfig {
    fn default() -> Self {
        Self {
            max_lock_duration_secs: DEFAULT_MAX_LOCK_DURATION_SECS,
            default_ttl_secs: DEFAULT_TTL_SECS,
            lock_mode: LockMode::Advisory,
        }
    }
}

impl TransientConfig {
    /// Loads overrides from the environment (and `.env`, if present).
    ///
    /// Durations that are missing, unparseable, or not positive leave the
    /// default in effect. An unknown lock mode is logged and ignored.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let lock_mode = match std::env::var(ENV_LOCK_MODE) {
            Ok(raw) => raw.parse::<LockMode>().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring {}", ENV_LOCK_MODE);
                defaults.lock_mode
            }),
            Err(_) => defaults.lock_mode,
        };

        Self {
            max_lock_duration_secs: positive_secs(
                std::env::var(ENV_MAX_LOCK_DURATION).ok().as_deref(),
                defaults.max_lock_duration_secs,
            ),
            default_ttl_secs: positive_secs(
                std::env::var(ENV_DEFAULT_TTL).ok().as_deref(),
                defaults.default_ttl_secs,
            ),
            lock_mode,
        }
    }

    /// Overrides the maximum lock duration. Values ≤ 0 are ignored.
    pub fn with_max_lock_duration(mut self, seconds: i64) -> Self {
        if let Ok(secs) = u64::try_from(seconds) {
            if secs > 0 {
                self.max_lock_duration_secs = secs;
            }
        }
        self
    }

    /// Sets the default cache lifetime. Negative values clamp to 0.
    pub fn with_default_ttl(mut self, seconds: i64) -> Self {
        self.default_ttl_secs = clamp_ttl(seconds);
        self
    }

    /// Sets the lock mode.
    pub fn with_lock_mode(mut self, mode: LockMode) -> Self {
        self.lock_mode = mode;
        self
    }
}

/// Clamps a caller-supplied TTL to the non-negative range.
pub(crate) fn clamp_ttl(seconds: i64) -> u64 {
    u64::try_from(seconds).unwrap_or(0)
}

/// Parses a positive number of seconds, falling back to `default`.
fn positive_secs(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|v| u64::try_from(v).ok())
        .filter(|&v| v > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(None, 100 ; "missing")]
    #[test_case(Some("250"), 250 ; "positive")]
    #[test_case(Some(" 30 "), 30 ; "padded")]
    #[test_case(Some("0"), 100 ; "zero keeps default")]
    #[test_case(Some("-5"), 100 ; "negative keeps default")]
    #[test_case(Some("soon"), 100 ; "garbage keeps default")]
    fn test_positive_secs(raw: Option<&str>, expected: u64) {
        assert_eq!(positive_secs(raw, 100), expected);
    }

    #[test_case(600, 600 ; "positive")]
    #[test_case(0, 0 ; "zero")]
    #[test_case(-1, 0 ; "negative clamps")]
    fn test_clamp_ttl(input: i64, expected: u64) {
        assert_eq!(clamp_ttl(input), expected);
    }

    #[test]
    fn test_defaults() {
        let config = TransientConfig::default();
        assert_eq!(config.max_lock_duration_secs, 100);
        assert_eq!(config.default_ttl_secs, 600);
        assert_eq!(config.lock_mode, LockMode::Advisory);
    }

    #[test]
    fn test_max_lock_duration_ignores_non_positive() {
        let config = TransientConfig::default().with_max_lock_duration(0);
        assert_eq!(config.max_lock_duration_secs, 100);
        let config = config.with_max_lock_duration(-20);
        assert_eq!(config.max_lock_duration_secs, 100);
        let config = config.with_max_lock_duration(5);
        assert_eq!(config.max_lock_duration_secs, 5);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: TransientConfig =
            serde_json::from_str(r#"{"lock_mode":"exclusive"}"#).unwrap();
        assert_eq!(config.lock_mode, LockMode::Exclusive);
        assert_eq!(config.max_lock_duration_secs, 100);
    }
}

//! Fetch outcomes.
//!
//! A lookup either yields a value (served from the store or freshly
//! produced) or an empty-result carrying the reason nothing was produced.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a lookup returned no value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// No producer was configured, so nothing could be regenerated.
    NoProducer,
    /// Another caller holds a fresh lock on the key.
    Locked,
    /// The producer returned an error or panicked.
    ProducerFailed,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmptyReason::NoProducer => "no producer configured",
            EmptyReason::Locked => "regeneration in progress elsewhere",
            EmptyReason::ProducerFailed => "producer failed",
        };
        f.write_str(s)
    }
}

/// Outcome of a cache lookup.
///
/// Falsy values (`false`, `0`, `""`) are ordinary values here: only
/// [`Fetch::Empty`] means "no data".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetch<T> {
    /// Served from the store without invoking the producer.
    Cached(T),
    /// Produced by this call.
    Regenerated(T),
    /// No value this round.
    Empty(EmptyReason),
}

impl<T> Fetch<T> {
    /// Returns the value, discarding where it came from.
    pub fn into_value(self) -> Option<T> {
        match self {
            Fetch::Cached(v) | Fetch::Regenerated(v) => Some(v),
            Fetch::Empty(_) => None,
        }
    }

    /// Borrows the value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Fetch::Cached(v) | Fetch::Regenerated(v) => Some(v),
            Fetch::Empty(_) => None,
        }
    }

    /// Returns true for the empty-result.
    pub fn is_empty(&self) -> bool {
        matches!(self, Fetch::Empty(_))
    }

    /// Returns true if the value came from the store.
    pub fn is_cached(&self) -> bool {
        matches!(self, Fetch::Cached(_))
    }

    /// Returns true if the producer ran during this call and succeeded.
    pub fn is_regenerated(&self) -> bool {
        matches!(self, Fetch::Regenerated(_))
    }

    /// Returns the reason for an empty-result.
    pub fn empty_reason(&self) -> Option<EmptyReason> {
        match self {
            Fetch::Empty(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Maps the contained value, preserving its origin.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Fetch<U> {
        match self {
            Fetch::Cached(v) => Fetch::Cached(f(v)),
            Fetch::Regenerated(v) => Fetch::Regenerated(f(v)),
            Fetch::Empty(reason) => Fetch::Empty(reason),
        }
    }
}

impl<T> From<Fetch<T>> for Option<T> {
    fn from(fetch: Fetch<T>) -> Self {
        fetch.into_value()
    }
}

//! # Stampede Cache
//!
//! Single-flight TTL compute cache.
//!
//! A [`Transient`] caches the output of an expensive producer under a key
//! derived from a seed string, serves it until its TTL runs out, and
//! regenerates it on a miss. A secondary lock entry per key, managed by the
//! [`StampedeGuard`], stops concurrent callers from regenerating together:
//! a caller that finds the key locked gets [`Fetch::Empty`] instead of
//! waiting. Locks older than the maximum lock duration are presumed
//! abandoned and reclaimed.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use stampede_cache::{Fetch, MemoryStore, Transient};
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut temp = Transient::<i32>::new("weather:NYC", store).unwrap();
//! temp.expires_in(600)
//!     .unwrap()
//!     .updates_using(|args| Ok(args[0].as_i64().unwrap_or(0) as i32), vec![json!(72)]);
//!
//! assert_eq!(temp.get().unwrap(), Fetch::Regenerated(72));
//! assert_eq!(temp.get().unwrap(), Fetch::Cached(72));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod clock;
mod config;
mod guard;
mod key;
mod memory;
mod producer;
mod transient;

pub use clock::{ManualClock, SystemClock};
pub use config::TransientConfig;
pub use guard::StampedeGuard;
pub use key::CacheKey;
pub use memory::{MemoryStore, StoreStats};
pub use producer::{ProducerFn, ProducerRegistry};
pub use transient::Transient;

// Re-export the core vocabulary
pub use stampede_core::error::{Result, StampedeError};
pub use stampede_core::traits::{Clock, Store};
pub use stampede_core::types::{EmptyReason, Fetch, LockMode, LockOutcome};

//! Domain types for Stampede.
//!
//! - [`Fetch`]: Outcome of a cache lookup
//! - [`EmptyReason`]: Why a lookup produced no value
//! - [`LockMode`]: How the stampede lock is acquired
//! - [`LockOutcome`]: Result of a lock acquisition attempt

mod fetch;
mod lock;

pub use fetch::*;
pub use lock::*;

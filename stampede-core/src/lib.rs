//! # Stampede Core
//!
//! Core types, errors, and traits for the Stampede single-flight compute cache.
//!
//! This crate provides the foundational building blocks used by the other Stampede crates:
//!
//! - **Types**: Fetch outcomes, lock modes, and lock outcomes
//! - **Errors**: A single error enum with a `Result` alias
//! - **Constants**: Key namespaces, hashing sizes, and default durations
//! - **Traits**: The host-supplied [`Store`] and the [`Clock`] used for lock ages
//!
//! ## Example
//!
//! ```rust
//! use stampede_core::{EmptyReason, Fetch};
//!
//! let hit: Fetch<u32> = Fetch::Cached(72);
//! assert_eq!(hit.into_value(), Some(72));
//!
//! let miss: Fetch<u32> = Fetch::Empty(EmptyReason::Locked);
//! assert!(miss.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, StampedeError};
pub use traits::*;
pub use types::*;

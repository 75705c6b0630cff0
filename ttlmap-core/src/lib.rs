//! # TTLMAP Core
//!
//! Configuration, errors, and shared types for the ttlmap expiring store.
//!
//! This crate provides the building blocks used by `ttlmap-store`:
//!
//! - **Config**: Default TTL, reaper cadence, and max lifetime
//! - **Errors**: Configuration-boundary error type
//! - **Constants**: Documented defaults
//! - **Types**: Removal causes, refresh outcomes, and store statistics
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use ttlmap_core::TtlMapConfig;
//!
//! let config = TtlMapConfig::new()
//!     .default_ttl(Duration::from_millis(300))
//!     .cleanup_interval(Duration::from_millis(100));
//! assert!(config.validate().is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use config::TtlMapConfig;
pub use constants::*;
pub use error::{Result, TtlMapError};
pub use types::*;

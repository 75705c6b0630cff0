//! # TTLMAP Store
//!
//! In-process key-value store where every entry expires.
//!
//! ## Features
//!
//! - **Sliding Expiry**: Reads push an entry's deadline forward by its TTL
//! - **Max Lifetime**: Optional hard cap that touching cannot extend
//! - **Background Reaper**: Evicts expired entries on a fixed cadence
//! - **Removal Callbacks**: Run once per entry on removal or eviction
//! - **Refresh Coalescing**: At most one background refresh per key in flight
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use ttlmap_store::{TtlMap, TtlMapConfig};
//!
//! let config = TtlMapConfig::new()
//!     .default_ttl(Duration::from_millis(300))
//!     .cleanup_interval(Duration::from_millis(100));
//! let store: TtlMap<String> = TtlMap::with_config(config)?;
//!
//! store.set("hello", "world".to_string(), None);
//! assert_eq!(store.get("hello").as_deref(), Some("world"));
//!
//! store.background_update("hello", || Ok::<_, std::io::Error>("fresh".to_string()));
//! assert_eq!(store.touch_get("hello", false).as_deref(), Some("fresh"));
//! # Ok::<(), ttlmap_store::TtlMapError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

mod background;
mod item;
mod key_mutex;
mod reaper;
mod store;

pub use item::RemovalCallback;
pub use key_mutex::{KeyLockGuard, KeyMutex};
pub use reaper::Reaper;
pub use store::TtlMap;

// Re-export the configuration surface from core
pub use ttlmap_core::{RefreshOutcome, RemovalCause, Result, StoreStats, TtlMapConfig, TtlMapError};

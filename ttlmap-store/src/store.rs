//! The expiring key-value store.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, instrument, trace};

use ttlmap_core::config::TtlMapConfig;
use ttlmap_core::error::Result;
use ttlmap_core::types::{RemovalCause, StoreStats};

use crate::item::{Item, RemovalCallback};
use crate::key_mutex::KeyMutex;
use crate::reaper::Reaper;

/// State shared between the store handle and its reaper thread.
struct Shared<V> {
    items: Mutex<HashMap<String, Item<V>>>,
    config: TtlMapConfig,
}

impl<V: Clone> Shared<V> {
    /// Removes every expired entry, then runs their callbacks outside the lock.
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let evicted: Vec<(String, Item<V>)> = {
            let mut items = self.items.lock();
            let expired: Vec<String> = items
                .iter()
                .filter(|(_, item)| item.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect();
            expired
                .into_iter()
                .filter_map(|key| items.remove_entry(&key))
                .collect()
        };

        let count = evicted.len();
        for (key, item) in evicted {
            item.fire(&key, RemovalCause::Expired);
        }
        count
    }
}

/// In-process key-value store with per-entry expiry.
///
/// Every read through [`get`](Self::get) slides the entry's deadline forward
/// by its TTL, up to the configured max lifetime. A background reaper evicts
/// entries whose deadline has passed and runs their removal callbacks.
///
/// # Thread Safety
///
/// All operations take `&self` and may be called concurrently; share the
/// store behind an `Arc`. Removal callbacks never run while the internal
/// lock is held, so they may call back into the store.
///
/// # Lifecycle
///
/// The reaper thread starts in the constructor and is stopped and joined
/// when the store is dropped or [`shutdown`](Self::shutdown) is called.
pub struct TtlMap<V> {
    shared: Arc<Shared<V>>,
    key_mutex: Arc<KeyMutex>,
    reaper: Mutex<Option<Reaper>>,
}

impl<V> TtlMap<V>
where
    V: Clone + Send + 'static,
{
    /// Creates a store with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(TtlMapConfig::default())
    }

    /// Creates a store with its own key mutex.
    pub fn with_config(config: TtlMapConfig) -> Result<Self> {
        Self::with_key_mutex(config, Arc::new(KeyMutex::new()))
    }

    /// Creates a store whose background refreshes are deduplicated through
    /// `key_mutex`.
    ///
    /// Pass the same mutex to several stores to give them one shared
    /// refresh scope.
    pub fn with_key_mutex(config: TtlMapConfig, key_mutex: Arc<KeyMutex>) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            items: Mutex::new(HashMap::new()),
            config,
        });

        let weak: Weak<Shared<V>> = Arc::downgrade(&shared);
        let reaper = Reaper::spawn(shared.config.interval(), move || match weak.upgrade() {
            Some(shared) => {
                let evicted = shared.sweep();
                if evicted > 0 {
                    trace!(evicted, "Reaper pass");
                }
                true
            }
            None => false,
        })?;

        debug!(
            default_ttl = ?shared.config.ttl(),
            cleanup_interval = ?shared.config.interval(),
            max_lifetime = ?shared.config.lifetime(),
            "Store created"
        );

        Ok(Self {
            shared,
            key_mutex,
            reaper: Mutex::new(Some(reaper)),
        })
    }

    /// Inserts or overwrites `key`.
    ///
    /// `ttl` of `None` uses the store default. Overwriting drops the previous
    /// entry without running its removal callback.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.insert(key.into(), value, ttl, None);
    }

    /// Inserts or overwrites `key`, attaching a callback run once when this
    /// entry is removed, expires, or is cleared.
    pub fn set_with_cleanup<F>(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Option<Duration>,
        on_remove: F,
    ) where
        F: FnOnce(&str, V, RemovalCause) + Send + 'static,
    {
        self.insert(key.into(), value, ttl, Some(Box::new(on_remove)));
    }

    fn insert(
        &self,
        key: String,
        value: V,
        ttl: Option<Duration>,
        on_remove: Option<RemovalCallback<V>>,
    ) {
        let ttl = ttl.unwrap_or_else(|| self.shared.config.ttl());
        let item = Item::new(
            value,
            ttl,
            self.shared.config.lifetime(),
            on_remove,
            Instant::now(),
        );
        let replaced = self.shared.items.lock().insert(key, item);
        // Dropped here, after the lock, so the old value's destructor
        // cannot stall other callers.
        drop(replaced);
    }

    /// Returns the value for `key` and slides its deadline forward.
    pub fn get(&self, key: &str) -> Option<V> {
        self.touch_get(key, true)
    }

    /// Returns the value for `key`, sliding its deadline only if `touch`.
    ///
    /// Expired entries are reported as missing even before the reaper
    /// removes them, and are never revived by a touch.
    pub fn touch_get(&self, key: &str, touch: bool) -> Option<V> {
        let now = Instant::now();
        let mut items = self.shared.items.lock();
        let item = items.get_mut(key)?;
        if item.is_expired(now) {
            return None;
        }
        if touch {
            item.touch(now);
        }
        Some(item.value().clone())
    }

    /// Slides the deadline of `key` without reading it.
    ///
    /// Returns false if the key is missing or already expired.
    pub fn touch(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut items = self.shared.items.lock();
        match items.get_mut(key) {
            Some(item) if !item.is_expired(now) => {
                item.touch(now);
                true
            }
            _ => false,
        }
    }

    /// Deletes `key`, running its removal callback before returning.
    ///
    /// Returns the removed value, or `None` if the key was absent.
    #[instrument(skip(self))]
    pub fn remove(&self, key: &str) -> Option<V> {
        let removed = self.shared.items.lock().remove_entry(key);
        removed.map(|(key, item)| {
            debug!("Removed entry");
            item.fire(&key, RemovalCause::Removed)
        })
    }

    /// Snapshot of every unexpired entry.
    ///
    /// Does not touch entries or evict expired ones.
    pub fn items(&self) -> HashMap<String, V> {
        let now = Instant::now();
        self.shared
            .items
            .lock()
            .iter()
            .filter(|(_, item)| !item.is_expired(now))
            .map(|(key, item)| (key.clone(), item.value().clone()))
            .collect()
    }

    /// Evicts expired entries now instead of waiting for the reaper.
    ///
    /// Returns how many entries were evicted.
    pub fn cleanup_expired(&self) -> usize {
        self.shared.sweep()
    }

    /// Removes every entry, running each removal callback.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        let drained: Vec<(String, Item<V>)> = self.shared.items.lock().drain().collect();
        debug!(count = drained.len(), "Clearing store");
        for (key, item) in drained {
            item.fire(&key, RemovalCause::Cleared);
        }
    }

    /// Number of stored entries, including expired ones not yet reaped.
    pub fn len(&self) -> usize {
        self.shared.items.lock().len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.shared.items.lock().is_empty()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        let now = Instant::now();
        let items = self.shared.items.lock();
        let expired = items.values().filter(|item| item.is_expired(now)).count();
        StoreStats {
            total_entries: items.len(),
            expired_entries: expired,
            live_entries: items.len().saturating_sub(expired),
        }
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &TtlMapConfig {
        &self.shared.config
    }

    /// The key mutex gating background refreshes.
    pub fn key_mutex(&self) -> &Arc<KeyMutex> {
        &self.key_mutex
    }

    /// Returns true while the reaper thread is running.
    pub fn is_reaping(&self) -> bool {
        self.reaper
            .lock()
            .as_ref()
            .map(Reaper::is_running)
            .unwrap_or(false)
    }

    /// Stops the reaper and waits for it to exit.
    ///
    /// The store stays usable; expired entries are then only filtered on
    /// read and evicted by [`cleanup_expired`](Self::cleanup_expired).
    /// Idempotent.
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        let reaper = self.reaper.lock().take();
        if let Some(mut reaper) = reaper {
            reaper.stop();
            debug!("Store reaper shut down");
        }
    }
}

impl<V> std::fmt::Debug for TtlMap<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlMap")
            .field("entries", &self.shared.items.lock().len())
            .field("config", &self.shared.config)
            .finish()
    }
}

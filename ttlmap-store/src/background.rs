//! Coalesced background refreshes.

use std::fmt::Display;

use tracing::{debug, instrument};

use ttlmap_core::types::RefreshOutcome;

use crate::store::TtlMap;

impl<V> TtlMap<V>
where
    V: Clone + Send + 'static,
{
    /// Refreshes `key` with `updater` unless a refresh for it is already running.
    ///
    /// Holds the key in the store's [`KeyMutex`](crate::KeyMutex) for the
    /// whole updater call. A concurrent call for the same key returns
    /// [`RefreshOutcome::Skipped`] at once: nothing is queued or retried.
    /// On success the value is stored with the default TTL. On failure the
    /// store is left unchanged and the error is dropped after logging.
    ///
    /// The key is released on every exit path, including an updater panic,
    /// which propagates to the caller.
    #[instrument(skip(self, updater))]
    pub fn background_update<F, E>(&self, key: &str, updater: F) -> RefreshOutcome
    where
        F: FnOnce() -> std::result::Result<V, E>,
        E: Display,
    {
        let Some(_guard) = self.key_mutex().try_lock(key) else {
            debug!("Refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        };

        match updater() {
            Ok(value) => {
                self.set(key, value, None);
                debug!("Refresh stored");
                RefreshOutcome::Updated
            }
            Err(e) => {
                debug!(error = %e, "Refresh failed, keeping current value");
                RefreshOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use ttlmap_core::config::TtlMapConfig;

    use crate::key_mutex::KeyMutex;

    fn store() -> TtlMap<String> {
        TtlMap::with_config(
            TtlMapConfig::new()
                .default_ttl(Duration::from_secs(60))
                .cleanup_interval(Duration::from_secs(3600)),
        )
        .unwrap()
    }

    #[test]
    fn test_update_stores_value() {
        let store = store();
        let outcome = store.background_update("k", || Ok::<_, String>("fresh".to_string()));
        assert_eq!(outcome, RefreshOutcome::Updated);
        assert!(outcome.ran());
        assert_eq!(store.get("k").as_deref(), Some("fresh"));
        assert!(!store.key_mutex().is_locked("k"));
    }

    #[test]
    fn test_failure_leaves_store_unchanged() {
        let store = store();
        store.set("k", "old".to_string(), None);
        let outcome = store.background_update("k", || Err::<String, _>("upstream down"));
        assert_eq!(outcome, RefreshOutcome::Failed);
        assert!(outcome.ran());
        assert_eq!(store.get("k").as_deref(), Some("old"));
        assert!(!store.key_mutex().is_locked("k"));
    }

    #[test]
    fn test_skipped_while_locked() {
        let store = store();
        let guard = store.key_mutex().try_lock("k").unwrap();
        let ran = AtomicUsize::new(0);
        let outcome = store.background_update("k", || {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>("never".to_string())
        });
        assert_eq!(outcome, RefreshOutcome::Skipped);
        assert!(!outcome.ran());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(store.get("k"), None);
        drop(guard);
    }

    #[test]
    fn test_panicking_updater_releases_key() {
        let store = Arc::new(store());
        let panicking = Arc::clone(&store);
        let result = thread::spawn(move || {
            panicking.background_update("k", || -> Result<String, String> { panic!("updater") })
        })
        .join();
        assert!(result.is_err());
        assert!(!store.key_mutex().is_locked("k"));
    }

    #[test]
    fn test_concurrent_refresh_coalesced() {
        let store = Arc::new(store());
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let first = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store.background_update("k", move || {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok::<_, String>("first".to_string())
                })
            })
        };

        started_rx.recv().unwrap();
        let second = store.background_update("k", || Ok::<_, String>("second".to_string()));
        assert_eq!(second, RefreshOutcome::Skipped);
        assert_eq!(store.get("k"), None);

        release_tx.send(()).unwrap();
        assert_eq!(first.join().unwrap(), RefreshOutcome::Updated);
        assert_eq!(store.get("k").as_deref(), Some("first"));
    }

    #[test]
    fn test_shared_key_mutex_spans_stores() {
        let key_mutex = Arc::new(KeyMutex::new());
        let config = TtlMapConfig::new().cleanup_interval(Duration::from_secs(3600));
        let a: TtlMap<String> = TtlMap::with_key_mutex(config.clone(), Arc::clone(&key_mutex)).unwrap();
        let b: TtlMap<String> = TtlMap::with_key_mutex(config, Arc::clone(&key_mutex)).unwrap();

        let outcome = a.background_update("k", || {
            Ok::<_, String>(match b.background_update("k", || Ok::<_, String>("b".into())) {
                RefreshOutcome::Skipped => "a".to_string(),
                other => format!("{other:?}"),
            })
        });
        assert_eq!(outcome, RefreshOutcome::Updated);
        assert_eq!(a.get("k").as_deref(), Some("a"));
        assert_eq!(b.get("k"), None);
    }

    #[test]
    fn test_unrelated_keys_refresh_independently() {
        let store = store();
        let outcome = store.background_update("a", || {
            Ok::<_, String>(match store.background_update("b", || Ok::<_, String>("b".into())) {
                RefreshOutcome::Updated => "a".to_string(),
                other => format!("{other:?}"),
            })
        });
        assert_eq!(outcome, RefreshOutcome::Updated);
        assert_eq!(store.get("a").as_deref(), Some("a"));
        assert_eq!(store.get("b").as_deref(), Some("b"));
    }
}

//! Per-key mutual exclusion.
//!
//! A [`KeyMutex`] is a set of held string keys. Holding a key does not
//! protect any data by itself; it marks a semantic operation (typically a
//! refresh) as in flight so that concurrent callers can skip or wait.

use std::collections::HashSet;
use std::fmt;

use parking_lot::{Condvar, Mutex};

/// Set-based mutex keyed by string.
///
/// Unrelated keys never contend with each other beyond the short critical
/// section that updates the set. Share one instance behind an `Arc` to give
/// several stores a common deduplication scope.
#[derive(Default)]
pub struct KeyMutex {
    locked: Mutex<HashSet<String>>,
    released: Condvar,
}

impl KeyMutex {
    /// Creates an empty key mutex.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires `key` if nobody holds it.
    ///
    /// Never blocks. Returns `None` when the key is already held.
    pub fn try_lock(&self, key: &str) -> Option<KeyLockGuard<'_>> {
        let mut locked = self.locked.lock();
        if locked.contains(key) {
            return None;
        }
        locked.insert(key.to_string());
        Some(KeyLockGuard {
            mutex: self,
            key: key.to_string(),
        })
    }

    /// Acquires `key`, waiting until the current holder releases it.
    pub fn lock(&self, key: &str) -> KeyLockGuard<'_> {
        let mut locked = self.locked.lock();
        while locked.contains(key) {
            self.released.wait(&mut locked);
        }
        locked.insert(key.to_string());
        KeyLockGuard {
            mutex: self,
            key: key.to_string(),
        }
    }

    /// Returns true if `key` is currently held.
    pub fn is_locked(&self, key: &str) -> bool {
        self.locked.lock().contains(key)
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.locked.lock().len()
    }

    /// Returns true if no key is held.
    pub fn is_empty(&self) -> bool {
        self.locked.lock().is_empty()
    }

    fn unlock(&self, key: &str) {
        self.locked.lock().remove(key);
        // Waiters on other keys re-check and go back to sleep.
        self.released.notify_all();
    }
}

impl fmt::Debug for KeyMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMutex")
            .field("held", &self.len())
            .finish()
    }
}

/// Proof of holding a key in a [`KeyMutex`].
///
/// The key is released when the guard is dropped, including during unwinding.
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct KeyLockGuard<'a> {
    mutex: &'a KeyMutex,
    key: String,
}

impl KeyLockGuard<'_> {
    /// The held key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Releases the key now.
    pub fn unlock(self) {}
}

impl Drop for KeyLockGuard<'_> {
    fn drop(&mut self) {
        self.mutex.unlock(&self.key);
    }
}

impl fmt::Debug for KeyLockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyLockGuard").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_try_lock_exclusive() {
        let km = KeyMutex::new();
        let guard = km.try_lock("a").unwrap();
        assert!(km.try_lock("a").is_none());
        assert!(km.is_locked("a"));
        drop(guard);
        assert!(!km.is_locked("a"));
        assert!(km.try_lock("a").is_some());
    }

    #[test]
    fn test_keys_independent() {
        let km = KeyMutex::new();
        let _a = km.try_lock("a").unwrap();
        let _b = km.try_lock("b").unwrap();
        assert_eq!(km.len(), 2);
    }

    #[test]
    fn test_explicit_unlock() {
        let km = KeyMutex::new();
        let guard = km.try_lock("a").unwrap();
        assert_eq!(guard.key(), "a");
        guard.unlock();
        assert!(km.is_empty());
    }

    #[test]
    fn test_released_on_panic() {
        let km = Arc::new(KeyMutex::new());
        let km2 = Arc::clone(&km);
        let result = thread::spawn(move || {
            let _guard = km2.try_lock("a").unwrap();
            panic!("boom");
        })
        .join();
        assert!(result.is_err());
        assert!(!km.is_locked("a"));
    }

    #[test]
    fn test_lock_waits_for_release() {
        let km = Arc::new(KeyMutex::new());
        let acquired = Arc::new(AtomicBool::new(false));
        let guard = km.try_lock("a").unwrap();

        let waiter = {
            let km = Arc::clone(&km);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                let _guard = km.lock("a");
                acquired.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));
        drop(guard);
        waiter.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert!(km.is_empty());
    }

    #[test]
    fn test_at_most_one_holder_under_contention() {
        let km = Arc::new(KeyMutex::new());
        let holders = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let km = Arc::clone(&km);
                let holders = Arc::clone(&holders);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    for _ in 0..200 {
                        if let Some(_guard) = km.try_lock("hot") {
                            let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            holders.fetch_sub(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(km.is_empty());
    }
}

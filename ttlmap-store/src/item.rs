//! Stored entries and their deadlines.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tracing::warn;

use ttlmap_core::constants::FAR_FUTURE;
use ttlmap_core::types::RemovalCause;

/// Callback invoked once when an entry is removed or evicted.
///
/// Receives the key, the owned value, and why the entry left the store.
pub type RemovalCallback<V> = Box<dyn FnOnce(&str, V, RemovalCause) + Send>;

/// A single stored value with its expiry bookkeeping.
pub(crate) struct Item<V> {
    value: V,
    ttl: Duration,
    expires_at: Instant,
    /// Creation time plus max lifetime; `expires_at` never passes it.
    lifetime_end: Option<Instant>,
    on_remove: Option<RemovalCallback<V>>,
}

impl<V> Item<V> {
    pub(crate) fn new(
        value: V,
        ttl: Duration,
        max_lifetime: Option<Duration>,
        on_remove: Option<RemovalCallback<V>>,
        now: Instant,
    ) -> Self {
        let mut item = Self {
            value,
            ttl,
            expires_at: now,
            lifetime_end: max_lifetime.map(|m| deadline_after(now, m)),
            on_remove,
        };
        item.touch(now);
        item
    }

    /// Pushes the deadline to `now + ttl`, clamped to the lifetime end.
    pub(crate) fn touch(&mut self, now: Instant) {
        let next = deadline_after(now, self.ttl);
        self.expires_at = match self.lifetime_end {
            Some(end) => next.min(end),
            None => next,
        };
    }

    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    pub(crate) fn value(&self) -> &V {
        &self.value
    }

    #[cfg(test)]
    pub(crate) fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Consumes the entry, running its callback if one is attached.
    ///
    /// A panicking callback is logged and swallowed so it cannot take the
    /// reaper thread down with it.
    pub(crate) fn fire(self, key: &str, cause: RemovalCause) -> V
    where
        V: Clone,
    {
        let Item {
            value, on_remove, ..
        } = self;
        if let Some(callback) = on_remove {
            let owned = value.clone();
            let result = panic::catch_unwind(AssertUnwindSafe(|| callback(key, owned, cause)));
            if result.is_err() {
                warn!(key, ?cause, "Removal callback panicked");
            }
        }
        value
    }
}

/// `now + span`, with spans beyond [`FAR_FUTURE`] treated as never expiring.
fn deadline_after(now: Instant, span: Duration) -> Instant {
    now.checked_add(span.min(FAR_FUTURE)).unwrap_or(now)
}

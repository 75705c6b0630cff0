//! Shared types for ttlmap.

use serde::{Deserialize, Serialize};

/// Why an entry left the store.
///
/// Overwriting a key with a new write is not a removal: the replaced
/// entry's callback is dropped without being invoked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalCause {
    /// Deleted by an explicit `remove`.
    Removed,
    /// Evicted by the reaper after its deadline passed.
    Expired,
    /// Dropped by `clear`.
    Cleared,
}

/// Result of a background refresh attempt.
///
/// Carries no error: a failing updater leaves the stored value untouched
/// and its error is discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshOutcome {
    /// The updater succeeded and its value was stored.
    Updated,
    /// Another refresh for the same key was already in flight.
    Skipped,
    /// The updater returned an error; the store is unchanged.
    Failed,
}

impl RefreshOutcome {
    /// Returns true if this call actually ran the updater.
    pub fn ran(&self) -> bool {
        !matches!(self, RefreshOutcome::Skipped)
    }
}

/// Point-in-time store statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Entries physically present, including expired ones not yet reaped
    pub total_entries: usize,
    /// Entries past their deadline awaiting the reaper
    pub expired_entries: usize,
    /// Entries still readable
    pub live_entries: usize,
}

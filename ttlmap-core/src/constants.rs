//! Defaults for ttlmap.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// EXPIRY DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// TTL applied when a write does not name one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(1);

/// Reaper wake cadence used when none (or zero) is configured.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Longest span an entry deadline is pushed out by.
///
/// Larger TTLs and lifetimes, up to `Duration::MAX`, saturate here and
/// mean "never expires" in practice.
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Environment variable overriding the default TTL, in milliseconds.
pub const ENV_DEFAULT_TTL_MS: &str = "TTLMAP_DEFAULT_TTL_MS";

/// Environment variable overriding the reaper cadence, in milliseconds.
pub const ENV_CLEANUP_INTERVAL_MS: &str = "TTLMAP_CLEANUP_INTERVAL_MS";

/// Environment variable setting the max lifetime, in milliseconds.
/// Unset or empty means no cap.
pub const ENV_MAX_LIFETIME_MS: &str = "TTLMAP_MAX_LIFETIME_MS";

/// Name of the reaper thread.
pub const REAPER_THREAD_NAME: &str = "ttlmap-reaper";

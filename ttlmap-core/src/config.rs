//! Store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CLEANUP_INTERVAL, DEFAULT_TTL, ENV_CLEANUP_INTERVAL_MS, ENV_DEFAULT_TTL_MS,
    ENV_MAX_LIFETIME_MS,
};
use crate::error::{Result, TtlMapError};

/// Store configuration.
///
/// Durations are kept as milliseconds so the config round-trips through
/// JSON or environment variables unchanged. Zero TTL or cleanup interval
/// falls back to the documented defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlMapConfig {
    /// TTL applied when a write omits one, in milliseconds
    pub default_ttl_ms: u64,
    /// Reaper wake cadence, in milliseconds
    pub cleanup_interval_ms: u64,
    /// Absolute cap on any entry's lifetime, in milliseconds
    pub max_lifetime_ms: Option<u64>,
}

impl Default for TtlMapConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: whole_millis(DEFAULT_TTL),
            cleanup_interval_ms: whole_millis(DEFAULT_CLEANUP_INTERVAL),
            max_lifetime_ms: None,
        }
    }
}

impl TtlMapConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default TTL.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_ms = whole_millis(ttl);
        self
    }

    /// Sets the reaper cadence.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval_ms = whole_millis(interval);
        self
    }

    /// Caps every entry's total lifetime, regardless of touches.
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime_ms = Some(whole_millis(lifetime));
        self
    }

    /// Effective default TTL.
    pub fn ttl(&self) -> Duration {
        match self.default_ttl_ms {
            0 => DEFAULT_TTL,
            ms => Duration::from_millis(ms),
        }
    }

    /// Effective reaper cadence.
    pub fn interval(&self) -> Duration {
        match self.cleanup_interval_ms {
            0 => DEFAULT_CLEANUP_INTERVAL,
            ms => Duration::from_millis(ms),
        }
    }

    /// Effective max lifetime, if any.
    pub fn lifetime(&self) -> Option<Duration> {
        self.max_lifetime_ms.map(Duration::from_millis)
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_lifetime_ms == Some(0) {
            return Err(TtlMapError::InvalidConfig(
                "max lifetime must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Builds a configuration from `TTLMAP_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_millis(&lookup, ENV_DEFAULT_TTL_MS)? {
            config.default_ttl_ms = ms;
        }
        if let Some(ms) = parse_millis(&lookup, ENV_CLEANUP_INTERVAL_MS)? {
            config.cleanup_interval_ms = ms;
        }
        config.max_lifetime_ms = parse_millis(&lookup, ENV_MAX_LIFETIME_MS)?;

        config.validate()?;
        Ok(config)
    }
}

/// Milliseconds for `duration`, rounding any non-zero sub-millisecond span
/// up to 1 and saturating at `u64::MAX`.
fn whole_millis(duration: Duration) -> u64 {
    if duration.is_zero() {
        return 0;
    }
    u64::try_from(duration.as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

fn parse_millis<F>(lookup: &F, name: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| TtlMapError::EnvVar {
                name: name.to_string(),
                reason: e.to_string(),
            }),
    }
}

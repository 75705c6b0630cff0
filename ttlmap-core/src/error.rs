//! Error types for ttlmap.
//!
//! Store operations never fail: a missing key is `None`, and a failing
//! background refresh is swallowed. Errors only surface where a store is
//! configured or its reaper thread is started.

use thiserror::Error;

/// Result type alias using `TtlMapError`.
pub type Result<T> = std::result::Result<T, TtlMapError>;

/// Main error type for ttlmap construction.
#[derive(Debug, Error)]
pub enum TtlMapError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An environment variable could not be parsed.
    #[error("Invalid environment variable '{name}': {reason}")]
    EnvVar { name: String, reason: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // RUNTIME ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The OS refused to start the reaper thread.
    #[error("Failed to spawn reaper thread: {0}")]
    ReaperSpawn(#[from] std::io::Error),
}

impl TtlMapError {
    /// Returns true if this error comes from bad configuration input.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            TtlMapError::InvalidConfig(_) | TtlMapError::EnvVar { .. }
        )
    }
}

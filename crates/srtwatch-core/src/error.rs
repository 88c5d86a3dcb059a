// ── Core error types ──
//
// User-facing errors from srtwatch-core. Consumers never see transport
// failures here -- the store and reconciler are purely in-memory, so the
// only failure modes are bad input, missing targets, and watchlist I/O.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed report or removal request. Rejected before any state change.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Rename or removal target does not exist.
    #[error("Device not found: {identity}")]
    NotFound { identity: String },

    /// A rename would collide with an existing identity.
    #[error("Identity already in use: {identity}")]
    IdentityConflict { identity: String },

    /// Watchlist file I/O failed.
    #[error("Watchlist I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Watchlist (de)serialization failed.
    #[error("Watchlist serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns `true` if this error should map to an HTTP 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

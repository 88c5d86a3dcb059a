//! CLI error types with miette diagnostics.
//!
//! Maps core, transport, and config errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use srtwatch_config::ConfigError;
use srtwatch_core::CoreError;

/// Exit codes for scripting.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the monitor server at {url}")]
    #[diagnostic(
        code(srtwatch::connection_failed),
        help(
            "Check that the server is running and accessible.\n\
             URL: {url}\n\
             Try: srtwatch devices --server {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(srtwatch::timeout),
        help("Increase observer.timeout_secs in the config or check server responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(srtwatch::not_found),
        help("Run: srtwatch devices to see the current fleet")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("identity '{identifier}' already exists")]
    #[diagnostic(code(srtwatch::conflict))]
    Conflict { identifier: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Server error (HTTP {status}): {message}")]
    #[diagnostic(code(srtwatch::api_error))]
    ApiError { status: u16, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(srtwatch::validation))]
    Validation { field: String, reason: String },

    // ── Alerts ───────────────────────────────────────────────────────
    #[error("No webhook configured for alerts")]
    #[diagnostic(
        code(srtwatch::no_webhook),
        help(
            "Set observer.webhook_url in the config file, pass --webhook,\n\
             or export SRTWATCH_WEBHOOK."
        )
    )]
    NoWebhook,

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error")]
    #[diagnostic(code(srtwatch::config))]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(srtwatch::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::NoWebhook => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Error mappings ───────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { message } => Self::Validation {
                field: "report".into(),
                reason: message,
            },
            CoreError::NotFound { identity } => Self::NotFound {
                resource_type: "device".into(),
                identifier: identity,
            },
            CoreError::IdentityConflict { identity } => Self::Conflict {
                identifier: identity,
            },
            CoreError::Io(e) => Self::Io(e),
            CoreError::Serialization(e) => Self::Json(e),
        }
    }
}

impl CliError {
    /// Translate a transport error, attaching the server URL for context.
    pub fn from_api(err: srtwatch_api::Error, url: &url::Url) -> Self {
        match err {
            srtwatch_api::Error::Api { message, status } => match status {
                404 => Self::NotFound {
                    resource_type: "device".into(),
                    identifier: message,
                },
                _ => Self::ApiError { status, message },
            },
            srtwatch_api::Error::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            other if other.is_transient() => Self::ConnectionFailed {
                url: url.to_string(),
                source: Box::new(other),
            },
            other => Self::ApiError {
                status: 0,
                message: other.to_string(),
            },
        }
    }
}

//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use smartcb_config::ConfigError;
use smartcb_core::CoreError;

/// Process exit codes.
pub mod exit_code {
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
    #[error("Could not connect to breaker at {url}")]
    #[diagnostic(
        code(smartcb::connection_failed),
        help(
            "Check that the breaker is powered and on the same network.\n\
             URL: {url}\n\
             Try: smartcb scan"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Device at {endpoint} is a '{model}', not a SmartCB breaker")]
    #[diagnostic(
        code(smartcb::unsupported_device),
        help("Run: smartcb scan to find SmartCB breakers on this network")
    )]
    UnsupportedDevice { endpoint: String, model: String },

    #[error("No breaker is connected")]
    #[diagnostic(code(smartcb::not_connected))]
    NotConnected,

    #[error("Another operation is in progress ({state})")]
    #[diagnostic(code(smartcb::busy))]
    Busy { state: String },

    // ── Discovery ────────────────────────────────────────────────────
    #[error("No SmartCB breaker found ({probed} addresses probed)")]
    #[diagnostic(
        code(smartcb::no_device),
        help(
            "Make sure the breaker has joined your WiFi, then retry with a\n\
             longer --probe-timeout-ms, or name it directly with --host."
        )
    )]
    NoDeviceFound { probed: usize },

    #[error("Found {count} breakers: {found}")]
    #[diagnostic(
        code(smartcb::ambiguous_device),
        help("Pick one with --host, or save it with: smartcb connect <HOST> --save")
    )]
    AmbiguousDevice { count: usize, found: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Device error ({code}): {message}")]
    #[diagnostic(code(smartcb::api_error))]
    ApiError { code: String, message: String },

    #[error("Device rejected the request: {message}")]
    #[diagnostic(code(smartcb::rejected))]
    Rejected { message: String },

    #[error("{step} sync failed: {reason}")]
    #[diagnostic(code(smartcb::sync_failed))]
    SyncFailed { step: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(smartcb::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(smartcb::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: smartcb config set-device <HOST> --profile {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(smartcb::config))]
    Config(Box<figment::Error>),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(smartcb::timeout),
        help("Increase the timeout with --timeout-ms or move closer to the access point.")
    )]
    Timeout { timeout_ms: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(smartcb::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    #[diagnostic(code(smartcb::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(smartcb::internal))]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::UnsupportedDevice { .. } | Self::NotConnected => {
                exit_code::CONNECTION
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NoDeviceFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::AmbiguousDevice { .. } | Self::Busy { .. } => exit_code::CONFLICT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Timeout { timeout_ms } => CliError::Timeout { timeout_ms },

            CoreError::UnsupportedDevice { endpoint, model } => {
                CliError::UnsupportedDevice { endpoint, model }
            }

            CoreError::NotConnected => CliError::NotConnected,

            CoreError::InvalidTransition { from, .. } | CoreError::Busy { state: from } => {
                CliError::Busy {
                    state: from.to_string(),
                }
            }

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api { message, status } => CliError::ApiError {
                code: status.map_or_else(|| "malformed".into(), |s| s.to_string()),
                message,
            },

            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}

// ── Core error types ──
//
// User-facing errors from smartcb-core. Consumers never see reqwest
// errors or JSON parse failures directly: the `From<smartcb_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

use crate::manager::ConnectionState;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to device at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Device connection timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Device at {endpoint} reports model '{model}', which is not a SmartCB breaker")]
    UnsupportedDevice { endpoint: String, model: String },

    #[error("No device connected")]
    NotConnected,

    // ── State machine errors ─────────────────────────────────────────
    #[error("Cannot move from {from} to {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    #[error("Device manager is busy ({state})")]
    Busy { state: ConnectionState },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Device rejected the request: {message}")]
    Rejected { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<smartcb_api::Error> for CoreError {
    fn from(err: smartcb_api::Error) -> Self {
        match err {
            smartcb_api::Error::Transport(ref e) => {
                let url = e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string);
                if e.is_connect() || e.is_timeout() || e.is_request() {
                    CoreError::ConnectionFailed {
                        url,
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            smartcb_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            smartcb_api::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            smartcb_api::Error::Http { status, message } => CoreError::Api {
                message: format!("HTTP {status}: {message}"),
                status: Some(status),
            },
            smartcb_api::Error::Rejected { message } => CoreError::Rejected { message },
            smartcb_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Malformed device response: {message}"),
                status: None,
            },
        }
    }
}

use thiserror::Error;

/// Top-level error type for the `smartcb-api` crate.
///
/// Covers every failure mode of the device HTTP API: transport,
/// HTTP status, and body decoding. `smartcb-core` maps these into
/// domain-level errors and decides which ones are fatal.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, host unreachable, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request exceeded its deadline.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Device responses ────────────────────────────────────────────
    /// Non-success HTTP status from the device.
    #[error("Device returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The device answered but refused the operation (`{"success": false}`).
    #[error("Device rejected the request: {message}")]
    Rejected { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the device could not be reached at all
    /// (refused, unreachable, or timed out before a response arrived).
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the device answered with something we could not parse.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Deserialization { .. })
    }

    /// HTTP status code, if the device produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn timeout_is_transport_and_transient() {
        let err = Error::Timeout { timeout_ms: 1000 };
        assert!(err.is_transport());
        assert!(err.is_transient());
        assert!(!err.is_malformed());
    }

    #[test]
    fn server_errors_are_transient_but_not_transport() {
        let err = Error::Http {
            status: 503,
            message: "busy".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_transport());
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn malformed_body_is_neither() {
        let err = Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        };
        assert!(err.is_malformed());
        assert!(!err.is_transport());
        assert!(!err.is_transient());
    }
}

// ── Core error types ──
//
// User-facing errors from headgate-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<headgate_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Auth errors ──────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Registration rejected: {message}")]
    RegistrationRejected { message: String },

    #[error("Not logged in")]
    NotLoggedIn,

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Session closed")]
    SessionClosed,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("No motor controller is mapped to this account")]
    NoMotor,

    #[error("No gate valve with IMEI {imei} in this account")]
    ValveNotFound { imei: String },

    #[error("Account has {count} motor controllers; expected one")]
    MultipleMotors { count: usize },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Backend error: {message}")]
    Backend {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` for failures a fresh login could clear.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::NotLoggedIn
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<headgate_api::Error> for CoreError {
    fn from(err: headgate_api::Error) -> Self {
        match err {
            headgate_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            headgate_api::Error::Registration { message, .. } => {
                CoreError::RegistrationRejected { message }
            }
            headgate_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Backend {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            headgate_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            headgate_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            headgate_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            headgate_api::Error::Api { message, status } => CoreError::Backend {
                message,
                status: Some(status),
            },
            headgate_api::Error::Deserialization { message, .. } => CoreError::Backend {
                message: format!("Unreadable backend response: {message}"),
                status: None,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn api_auth_error_maps_to_authentication_failed() {
        let err = CoreError::from(headgate_api::Error::Authentication {
            message: "Invalid username or password".into(),
        });
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
        assert!(err.is_auth_failure());
    }

    #[test]
    fn api_status_error_keeps_status() {
        let err = CoreError::from(headgate_api::Error::Api {
            message: "Unknown IMEI".into(),
            status: 400,
        });
        match err {
            CoreError::Backend { status, .. } => assert_eq!(status, Some(400)),
            other => panic!("unexpected: {other:?}"),
        }
    }
}

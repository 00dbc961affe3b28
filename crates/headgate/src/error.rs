//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use headgate_config::{ConfigError, StoreError};
use headgate_core::CoreError;

/// Non-zero exit codes per the CLI conventions.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the backend at {url}")]
    #[diagnostic(
        code(headgate::connection_failed),
        help(
            "Check that the backend URL is correct and reachable.\n\
             URL: {url}\n\
             Try: headgate status -v"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS certificate verification failed for {url}")]
    #[diagnostic(
        code(headgate::tls_error),
        help(
            "The backend is using a certificate this machine does not trust.\n\
             Use --insecure (-k) to accept it, or configure ca_cert in your profile."
        )
    )]
    TlsError { url: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(headgate::auth_failed),
        help("Check the user name and password, then run: headgate login")
    )]
    AuthFailed { message: String },

    #[error("Registration rejected: {message}")]
    #[diagnostic(code(headgate::registration_rejected))]
    RegistrationRejected { message: String },

    #[error("Nobody is signed in")]
    #[diagnostic(code(headgate::not_logged_in), help("Run: headgate login"))]
    NotLoggedIn,

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(headgate::no_credentials),
        help(
            "Store one with: headgate config set-password\n\
             Or set the HEADGATE_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Devices ──────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(headgate::not_found),
        help("Run: headgate {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("This account has no motor controller")]
    #[diagnostic(
        code(headgate::no_motor),
        help(
            "Check the account's controllers with: headgate devices\n\
             A motor can be paired with: headgate map <MOTOR_IMEI> <VALVE_IMEI>"
        )
    )]
    NoMotor,

    #[error("Account reports {count} motor controllers")]
    #[diagnostic(
        code(headgate::multiple_motors),
        help(
            "The strict motor policy refuses ambiguous accounts.\n\
             Set motor_policy = \"first-wins\" in the profile to keep the first."
        )
    )]
    MultipleMotors { count: usize },

    // ── API ──────────────────────────────────────────────────────────

    #[error("Backend error: {message}")]
    #[diagnostic(code(headgate::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(headgate::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(headgate::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: headgate config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(headgate::no_config),
        help(
            "Create one with: headgate config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(headgate::config))]
    Config(String),

    #[error("Could not update the stored session: {0}")]
    #[diagnostic(
        code(headgate::session_store),
        help("The session file lives in the platform data directory; check permissions.")
    )]
    SessionStore(#[from] StoreError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(headgate::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(headgate::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NotLoggedIn | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } | Self::NoMotor => exit_code::NOT_FOUND,
            Self::RegistrationRejected { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::MultipleMotors { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::RegistrationRejected { message } => {
                CliError::RegistrationRejected { message }
            }

            CoreError::NotLoggedIn | CoreError::SessionClosed => CliError::NotLoggedIn,

            // rustls reports untrusted certificates as connect errors with
            // "certificate" in the message.
            CoreError::ConnectionFailed { url, reason }
                if reason.contains("certificate") || reason.contains("TLS error") =>
            {
                CliError::TlsError { url }
            }

            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NoMotor => CliError::NoMotor,

            CoreError::MultipleMotors { count } => CliError::MultipleMotors { count },

            CoreError::ValveNotFound { imei } => CliError::NotFound {
                resource_type: "valve".into(),
                identifier: imei,
                list_command: "valve list".into(),
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Backend { message, status } => CliError::ApiError { message, status },

            CoreError::Config { message } => CliError::Config(message),

            CoreError::Internal(message) => CliError::ApiError {
                message,
                status: None,
            },
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

            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },

            ConfigError::Serialization(e) => CliError::Config(e.to_string()),

            ConfigError::Figment(e) => CliError::Config(e.to_string()),

            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}

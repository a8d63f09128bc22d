//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use autelis_config::ConfigError;
use autelis_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to controller at {address}: {reason}")]
    #[diagnostic(
        code(autelis::connection_failed),
        help("Check that the controller is powered on and reachable.")
    )]
    ConnectionFailed { address: String, reason: String },

    #[error("Controller at {address} did not return a status document")]
    #[diagnostic(
        code(autelis::unreachable),
        help("Check the host, username and password for this profile.")
    )]
    Unreachable { address: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(autelis::timeout),
        help("Increase the timeout with --timeout (milliseconds).")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(autelis::no_credentials),
        help("Pass --username/--password or run: autelis config init")
    )]
    NoCredentials { profile: String },

    // ── Equipment ────────────────────────────────────────────────────

    #[error("Equipment '{element}' is not installed on this controller")]
    #[diagnostic(
        code(autelis::not_found),
        help("Run: autelis status to see installed equipment")
    )]
    EquipmentNotFound { element: String },

    #[error("Controller did not accept the command for '{element}'")]
    #[diagnostic(code(autelis::command_rejected))]
    CommandRejected { element: String },

    // ── Controller data ──────────────────────────────────────────────

    #[error("Controller returned an unusable status document: {message}")]
    #[diagnostic(code(autelis::malformed_status))]
    MalformedStatus { message: String },

    #[error("Controller error: {message}")]
    #[diagnostic(code(autelis::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(autelis::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(autelis::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No controller configured")]
    #[diagnostic(
        code(autelis::no_config),
        help("Pass --host or run: autelis config init\nExpected config at: {path}")
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(autelis::config))]
    Config { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not encode output: {0}")]
    #[diagnostic(code(autelis::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Unreachable { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::EquipmentNotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { address, reason } => {
                CliError::ConnectionFailed { address, reason }
            }

            CoreError::ControllerUnreachable { address } => CliError::Unreachable { address },

            CoreError::ControllerDisconnected => CliError::ConnectionFailed {
                address: "(disconnected)".into(),
                reason: "controller connection was lost".into(),
            },

            CoreError::Timeout => CliError::Timeout,

            err @ (CoreError::MissingElement { .. } | CoreError::InvalidValue { .. }) => {
                CliError::MalformedStatus {
                    message: err.to_string(),
                }
            }

            CoreError::EquipmentNotFound { element } => CliError::EquipmentNotFound { element },

            CoreError::Api { message, status: _ } => CliError::ApiError { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

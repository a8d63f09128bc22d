// ── Core error types ──
//
// User-facing errors from autelis-core. Consumers never see reqwest or
// quick-xml failures directly: the `From<autelis_api::Error>` impl
// translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to controller at {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Controller at {address} did not return a status document")]
    ControllerUnreachable { address: String },

    #[error("Controller disconnected")]
    ControllerDisconnected,

    #[error("Controller connection timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Status document is missing required element <{element}>")]
    MissingElement { element: String },

    #[error("Invalid value {value:?} for element <{element}>")]
    InvalidValue { element: String, value: String },

    #[error("Equipment not found: {element}")]
    EquipmentNotFound { element: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
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
    /// Returns `true` for a status document that failed validation.
    pub fn is_malformed_snapshot(&self) -> bool {
        matches!(
            self,
            Self::MissingElement { .. } | Self::InvalidValue { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<autelis_api::Error> for CoreError {
    fn from(err: autelis_api::Error) -> Self {
        use autelis_api::Error as ApiError;

        match err {
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        address: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::InvalidHost { host } => CoreError::Config {
                message: format!("Invalid controller host '{host}'"),
            },
            ApiError::ClientBuild(message) => CoreError::Internal(message),
            ApiError::Xml(e) => CoreError::Api {
                message: format!("Malformed status document: {e}"),
                status: None,
            },
            ApiError::UnexpectedRoot { tag } => CoreError::Api {
                message: format!("Unexpected status document root <{tag}>"),
                status: None,
            },
            ApiError::Connect { addr, source } => CoreError::ConnectionFailed {
                address: addr,
                reason: source.to_string(),
            },
            ApiError::Socket(e) => CoreError::ConnectionFailed {
                address: String::new(),
                reason: format!("TCP connection lost: {e}"),
            },
            ApiError::ConnectionClosed => CoreError::ControllerDisconnected,
            ApiError::ProbeTimeout { .. } => CoreError::Timeout,
            ApiError::ProbeRejected { reply } => CoreError::Api {
                message: format!("Invalid probe reply: {reply:?}"),
                status: None,
            },
        }
    }
}

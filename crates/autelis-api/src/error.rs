use thiserror::Error;

/// Top-level error type for the `autelis-api` crate.
///
/// Covers every failure mode of both controller interfaces: the HTTP
/// status/command interface and the TCP push-update port.
/// `autelis-core` maps these into user-facing diagnostics.
///
/// Expected network flakiness on the HTTP side never surfaces here: the
/// client reports it as an absent snapshot or a `false` command result.
/// On the TCP side every variant for which [`Error::is_transient`] returns
/// `true` is the listener's clean failure signal.
#[derive(Debug, Error)]
pub enum Error {
    // ── HTTP transport ──────────────────────────────────────────────
    /// HTTP transport error that is not a timeout, connect failure, or
    /// error status (those are absorbed by the client).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configured host cannot be used as a controller address.
    #[error("Invalid controller host '{host}'")]
    InvalidHost { host: String },

    /// Failed to build the underlying HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Status document ─────────────────────────────────────────────
    /// The status document is not well-formed XML.
    #[error("Malformed status document: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The status document parsed, but its root element is not `<response>`.
    #[error("Unexpected status document root <{tag}>")]
    UnexpectedRoot { tag: String },

    // ── TCP push port ───────────────────────────────────────────────
    /// Could not open the TCP connection (refused, DNS failure, unreachable).
    #[error("TCP connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Socket error while the connection was established.
    #[error("TCP connection to controller lost: {0}")]
    Socket(#[source] std::io::Error),

    /// The controller closed the connection.
    #[error("Controller closed the TCP connection")]
    ConnectionClosed,

    /// No reply to the liveness probe within the probe window.
    #[error("Controller did not answer the liveness probe within {timeout_ms}ms")]
    ProbeTimeout { timeout_ms: u64 },

    /// The probe reply did not carry the success marker.
    #[error("Controller returned an invalid probe reply: {reply:?}")]
    ProbeRejected { reply: String },
}

impl Error {
    /// Returns `true` if this is a transient network condition worth
    /// retrying: the owning supervisor may reconnect after a backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_status(),
            Self::Connect { .. }
            | Self::Socket(_)
            | Self::ConnectionClosed
            | Self::ProbeTimeout { .. }
            | Self::ProbeRejected { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the controller answered with something other than
    /// the expected status document or probe reply.
    pub fn is_protocol_mismatch(&self) -> bool {
        matches!(
            self,
            Self::Xml(_) | Self::UnexpectedRoot { .. } | Self::ProbeRejected { .. }
        )
    }
}

// HTTP command/status client
//
// Wraps `reqwest::Client` with the controller's two endpoints: `status.xml`
// for full snapshots and `set.cgi` for single-element commands. Every request
// is one authenticated GET with a short timeout; nothing is kept between
// requests, so one client can be shared by the poll loop and command handlers.

use secrecy::ExposeSecret;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::status::StatusSnapshot;
use crate::transport::{ControllerEndpoint, Credentials};

const STATUS_ENDPOINT: &str = "status.xml";
const COMMAND_ENDPOINT: &str = "set.cgi";

const ON_VALUE: i32 = 1;
const OFF_VALUE: i32 = 0;

/// Query parameter carrying the value of a `set.cgi` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandLabel {
    /// On/off state of a circuit or feature.
    Value,
    /// Heater setpoint temperature.
    Temp,
    /// Pentair heater setting code.
    HeatValue,
}

impl CommandLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Temp => "temp",
            Self::HeatValue => "hval",
        }
    }
}

/// Raw HTTP client for the controller's status and command interface.
///
/// Expected network trouble (timeouts, refused connections, HTTP error
/// statuses) is logged and reported as an absent snapshot or a `false`
/// command result. Only unexpected failures come back as `Err`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl HttpClient {
    /// Create a client for the given endpoint.
    pub fn new(endpoint: &ControllerEndpoint, credentials: Credentials) -> Result<Self, Error> {
        let http = endpoint.build_client()?;
        Ok(Self {
            http,
            base_url: endpoint.http_url().clone(),
            credentials,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: Credentials) -> Self {
        Self {
            http,
            base_url,
            credentials,
        }
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    pub(crate) fn status_url(&self) -> Result<Url, Error> {
        Ok(self.base_url.join(STATUS_ENDPOINT)?)
    }

    pub(crate) fn command_url(
        &self,
        element: &str,
        label: CommandLabel,
        value: i32,
    ) -> Result<Url, Error> {
        let mut url = self.base_url.join(COMMAND_ENDPOINT)?;
        url.query_pairs_mut()
            .append_pair("name", element)
            .append_pair(label.as_str(), &value.to_string());
        Ok(url)
    }

    // ── Status ───────────────────────────────────────────────────────

    /// Fetch and parse the status document.
    ///
    /// Returns `Ok(None)` when the controller could not be reached, answered
    /// with an error status, or returned a document that is not a status
    /// response.
    pub async fn get_status(&self) -> Result<Option<StatusSnapshot>, Error> {
        let url = self.status_url()?;
        debug!("GET {}", url);

        let body = match self.get_text(url.clone()).await {
            Ok(body) => body,
            Err(e) if is_expected_failure(&e) => {
                warn!(url = %url, error = %e, "status request failed");
                return Ok(None);
            }
            Err(e) => return Err(Error::Transport(e)),
        };

        match StatusSnapshot::parse(&body) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) if e.is_protocol_mismatch() => {
                warn!(url = %url, error = %e, "controller returned an invalid status document");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Set `label` of `element` to `value` through `set.cgi`.
    ///
    /// Returns `Ok(false)` when the controller could not be reached or
    /// rejected the request.
    pub async fn send_command(
        &self,
        element: &str,
        label: CommandLabel,
        value: i32,
    ) -> Result<bool, Error> {
        let url = self.command_url(element, label, value)?;
        debug!(element, label = label.as_str(), value, "GET {}", url);

        match self.get_text(url).await {
            Ok(body) => {
                debug!(response = %body.trim(), "command accepted");
                Ok(true)
            }
            Err(e) if is_expected_failure(&e) => {
                warn!(element, error = %e, "command request failed");
                Ok(false)
            }
            Err(e) => Err(Error::Transport(e)),
        }
    }

    /// Turn a circuit or feature on.
    pub async fn on(&self, element: &str) -> Result<bool, Error> {
        self.send_command(element, CommandLabel::Value, ON_VALUE).await
    }

    /// Turn a circuit or feature off.
    pub async fn off(&self, element: &str) -> Result<bool, Error> {
        self.send_command(element, CommandLabel::Value, OFF_VALUE).await
    }

    /// Change a heater setpoint (`poolsp`, `spasp`).
    pub async fn set_temp(&self, element: &str, value: i32) -> Result<bool, Error> {
        self.send_command(element, CommandLabel::Temp, value).await
    }

    /// Change a heater setting (`poolht`, `spaht`); Pentair firmware only.
    pub async fn set_heat_setting(&self, element: &str, value: i32) -> Result<bool, Error> {
        self.send_command(element, CommandLabel::HeatValue, value).await
    }

    // ── Request helper ───────────────────────────────────────────────

    /// One authenticated GET. HTTP error statuses come back as errors.
    async fn get_text(&self, url: Url) -> Result<String, reqwest::Error> {
        self.http
            .get(url)
            .basic_auth(
                &self.credentials.username,
                Some(self.credentials.password.expose_secret()),
            )
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// Timeouts, refused connections and HTTP error statuses are routine for a
/// controller on a flaky home network.
fn is_expected_failure(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_status()
}

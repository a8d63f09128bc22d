// Controller addressing and shared transport settings.
//
// The HTTP client and the TCP push listener reach the same controller on
// different ports. `ControllerEndpoint` resolves both addresses once, up
// front, and carries the request timeout; `Credentials` holds the basic-auth
// pair for the HTTP side.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::Error;

/// TCP serial-port interface port on the controller.
pub const DEFAULT_TCP_PORT: u16 = 6000;

/// HTTP request timeout: slightly above a multiple of 3s, the TCP
/// retransmission window.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_millis(3050);

const USER_AGENT: &str = concat!("autelis/", env!("CARGO_PKG_VERSION"));

/// Basic-auth credentials for the HTTP command interface.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Where a controller lives. Immutable once built.
#[derive(Debug, Clone)]
pub struct ControllerEndpoint {
    http_url: Url,
    tcp_host: String,
    tcp_port: u16,
    http_timeout: Duration,
}

impl ControllerEndpoint {
    /// Build an endpoint from a host name or IP address.
    ///
    /// The host may carry an explicit HTTP port (`192.168.1.20:8080`); the
    /// TCP push port is always resolved against the bare host.
    pub fn new(host: &str) -> Result<Self, Error> {
        let trimmed = host.trim().trim_end_matches('/');
        let invalid = || Error::InvalidHost {
            host: host.to_owned(),
        };

        if trimmed.is_empty() || trimmed.contains("://") || trimmed.contains('/') {
            return Err(invalid());
        }

        let http_url = Url::parse(&format!("http://{trimmed}/")).map_err(|_| invalid())?;
        let tcp_host = http_url.host_str().ok_or_else(invalid)?.to_owned();

        Ok(Self {
            http_url,
            tcp_host,
            tcp_port: DEFAULT_TCP_PORT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        })
    }

    /// Build an endpoint around an explicit base URL (e.g. a mock server).
    pub fn from_url(http_url: Url) -> Result<Self, Error> {
        let tcp_host = http_url
            .host_str()
            .ok_or_else(|| Error::InvalidHost {
                host: http_url.to_string(),
            })?
            .to_owned();

        Ok(Self {
            http_url,
            tcp_host,
            tcp_port: DEFAULT_TCP_PORT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        })
    }

    /// Override the TCP push port.
    pub fn with_tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = port;
        self
    }

    /// Override the HTTP request timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn http_url(&self) -> &Url {
        &self.http_url
    }

    pub fn tcp_host(&self) -> &str {
        &self.tcp_host
    }

    pub fn tcp_port(&self) -> u16 {
        self.tcp_port
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    /// `host:port` of the push interface, bracketing IPv6 literals.
    pub fn tcp_addr(&self) -> String {
        if self.tcp_host.contains(':') && !self.tcp_host.starts_with('[') {
            format!("[{}]:{}", self.tcp_host, self.tcp_port)
        } else {
            format!("{}:{}", self.tcp_host, self.tcp_port)
        }
    }

    /// Build a `reqwest::Client` bound to this endpoint's timeout.
    ///
    /// The controller keeps no session: every request carries its own basic
    /// auth header, so the client holds no cookie jar.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }
}

// ── Runtime connection configuration ──
//
// These types describe *how* to reach an Autelis controller.
// They carry credential data and timing, but never touch disk.
// The CLI constructs a `ControllerConfig` and hands it in.

use std::time::Duration;

use autelis_api::listener::ListenerConfig;
use autelis_api::transport::{DEFAULT_HTTP_TIMEOUT, DEFAULT_TCP_PORT};
use secrecy::SecretString;

/// Default status poll interval, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Exponential backoff for reconnecting the push listener.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

/// Configuration for one controller.
///
/// Built by the CLI, passed to `Controller`; core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Host name or IP address, optionally with an HTTP port.
    pub host: String,
    /// HTTP basic-auth user.
    pub username: String,
    /// HTTP basic-auth password.
    pub password: SecretString,
    /// HTTP request timeout.
    pub http_timeout: Duration,
    /// TCP push-update port.
    pub tcp_port: u16,
    /// How often to poll `status.xml` (seconds). 0 = never.
    pub poll_interval_secs: u64,
    /// Keep a push-update connection open alongside polling.
    pub push_enabled: bool,
    /// Idle and probe timing for the push connection.
    pub listener: ListenerConfig,
    /// Backoff between push reconnection attempts.
    pub reconnect: ReconnectConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: "admin".into(),
            password: SecretString::from(String::new()),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            tcp_port: DEFAULT_TCP_PORT,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            push_enabled: true,
            listener: ListenerConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

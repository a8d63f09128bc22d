// ── Controller abstraction ──
//
// Full lifecycle management for one Autelis controller. Handles discovery,
// periodic status polling, the push-update connection with reconnect
// backoff, and command routing, all writing into one DeviceStore.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use autelis_api::{ControllerEndpoint, Credentials, HttpClient, PushListener, StatusUpdateEvent};

use crate::command::Command;
use crate::config::{ControllerConfig, ReconnectConfig};
use crate::error::CoreError;
use crate::model::PoolState;
use crate::store::DeviceStore;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Polling works; the push connection is down and being retried.
    Reconnecting { attempt: u32 },
    Failed,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    endpoint: ControllerEndpoint,
    client: HttpClient,
    store: Arc<DeviceStore>,
    connection_state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a new Controller from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to discover and start background tasks.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let endpoint = ControllerEndpoint::new(&config.host)?
            .with_tcp_port(config.tcp_port)
            .with_http_timeout(config.http_timeout);
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let client = HttpClient::new(&endpoint, credentials)?;
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                endpoint,
                client,
                store: Arc::new(DeviceStore::new()),
                connection_state,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn endpoint(&self) -> &ControllerEndpoint {
        &self.inner.endpoint
    }

    /// Access the underlying DeviceStore.
    pub fn store(&self) -> &Arc<DeviceStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to the controller.
    ///
    /// Fetches the status document once, registers the installed
    /// equipment, and spawns background tasks (periodic refresh, push
    /// supervisor). Fails if the controller does not answer.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.set_state(ConnectionState::Connecting);

        if let Err(e) = self.discover().await {
            self.set_state(ConnectionState::Failed);
            return Err(e);
        }

        let config = &self.inner.config;
        let mut handles = self.inner.task_handles.lock().await;

        if config.poll_interval_secs > 0 {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(refresh_task(
                ctrl,
                config.poll_interval_secs,
                cancel,
            )));
        }

        if config.push_enabled {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(push_task(ctrl, cancel)));
        }

        self.set_state(ConnectionState::Connected);
        info!(address = %self.inner.endpoint.http_url(), "connected to controller");
        Ok(())
    }

    /// Disconnect from the controller.
    ///
    /// Cancels background tasks, closing the push connection, and resets
    /// the connection state to [`Disconnected`](ConnectionState::Disconnected).
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.set_state(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    async fn discover(&self) -> Result<(), CoreError> {
        let Some(snapshot) = self.inner.client.get_status().await? else {
            error!("no status document returned from controller on startup");
            return Err(CoreError::ControllerUnreachable {
                address: self.inner.endpoint.http_url().to_string(),
            });
        };

        self.inner.store.discover(&snapshot)?;

        let state = self.inner.store.state();
        info!(
            equipment = state.equipment.len(),
            unit = %state.unit,
            "discovered controller equipment"
        );
        Ok(())
    }

    /// Poll the status document once and apply it.
    ///
    /// Returns `Ok(false)` when the controller did not answer (the store is
    /// marked unreachable) or the document failed validation (the store is
    /// left as it was).
    pub async fn refresh(&self) -> Result<bool, CoreError> {
        let store = &self.inner.store;

        let Some(snapshot) = self.inner.client.get_status().await? else {
            store.mark_unreachable();
            return Ok(false);
        };

        match store.apply_snapshot(&snapshot) {
            Ok(()) => {
                debug!("status refresh complete");
                Ok(true)
            }
            Err(e) if e.is_malformed_snapshot() => {
                warn!(error = %e, "ignoring malformed status document");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command against the controller.
    ///
    /// Returns `Ok(false)` if the controller could not be reached or
    /// rejected the request. Accepted commands are mirrored into the store
    /// straight away.
    pub async fn execute(&self, cmd: Command) -> Result<bool, CoreError> {
        if matches!(
            *self.inner.connection_state.borrow(),
            ConnectionState::Disconnected | ConnectionState::Connecting | ConnectionState::Failed
        ) {
            return Err(CoreError::ControllerDisconnected);
        }

        if let Some(element) = cmd.equipment() {
            if !self.inner.store.has_equipment(element) {
                return Err(CoreError::EquipmentNotFound {
                    element: element.to_owned(),
                });
            }
        }

        let request = cmd.request();
        let accepted = self
            .inner
            .client
            .send_command(request.element, request.label, request.value)
            .await?;

        if accepted {
            let update = cmd.expected_update();
            if !self.inner.store.apply_event(&update) {
                debug!(element = %update.element, "accepted command has no state to mirror");
            }
        } else {
            warn!(element = request.element, "controller did not accept command");
        }

        Ok(accepted)
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: connect, run closure, disconnect.
    ///
    /// Disables the push connection and periodic polling since the CLI only
    /// needs a single request-response cycle.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.push_enabled = false;
        cfg.poll_interval_secs = 0;

        let controller = Controller::new(cfg)?;
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Clone of the current pool state.
    pub fn state(&self) -> PoolState {
        self.inner.store.state()
    }

    /// Subscribe to pool state changes.
    pub fn subscribe(&self) -> watch::Receiver<PoolState> {
        self.inner.store.subscribe()
    }

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        self.inner.connection_state.send_replace(state);
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically poll the status document.
///
/// Unreachable or malformed polls come back as `Ok(false)` and are retried
/// on the next tick. Any `Err` ends polling and marks the controller
/// [`Failed`](ConnectionState::Failed).
async fn refresh_task(controller: Controller, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.refresh().await {
                    error!(error = %e, "status polling failed, stopping");
                    controller.inner.store.mark_unreachable();
                    controller.set_state(ConnectionState::Failed);
                    break;
                }
            }
        }
    }

    debug!("refresh task exiting");
}

/// Keep a push connection open: connect, receive until it fails, back off,
/// reconnect.
async fn push_task(controller: Controller, cancel: CancellationToken) {
    let inner = &controller.inner;
    let reconnect = &inner.config.reconnect;
    let store = &inner.store;
    let mut attempt: u32 = 0;

    loop {
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            connected = PushListener::connect(&inner.endpoint, inner.config.listener.clone()) => connected,
        };

        let result = match connected {
            Ok(listener) => {
                attempt = 0;
                controller.set_state(ConnectionState::Connected);
                info!(peer = listener.peer(), "push listener connected");

                let mut handler = |event: StatusUpdateEvent| store.apply_event(&event);
                listener.run(&mut handler, &cancel).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => break,
            Err(e) if e.is_transient() => {
                warn!(error = %e, attempt, "push connection error");

                if let Some(max) = reconnect.max_retries {
                    if attempt >= max {
                        error!(max_retries = max, "push reconnection limit reached, giving up");
                        break;
                    }
                }

                let delay = calculate_backoff(attempt, reconnect);
                attempt += 1;
                controller.set_state(ConnectionState::Reconnecting { attempt });
                info!(
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                    "waiting before push reconnect"
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => {
                error!(error = %e, "push listener failed");
                break;
            }
        }
    }

    debug!("push supervisor exiting");
}

// ── Backoff ──────────────────────────────────────────────────────

/// Exponential backoff with deterministic jitter.
///
/// `initial_delay * 2^attempt`, capped at `max_delay`, then scaled by a
/// jitter factor in [0.75, 1.25].
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        // attempt 0: sin(0) = 0, so exactly the initial delay
        assert_eq!(d0, Duration::from_secs(1));
        assert!(d1 > Duration::from_millis(1500), "d1 = {d1:?}");
        assert!(d2 > d1, "d2 = {d2:?}, d1 = {d1:?}");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig::default();
        let max_with_jitter = config.max_delay.mul_f64(1.25);

        for attempt in [5, 10, 31, 64, u32::MAX] {
            let d = calculate_backoff(attempt, &config);
            assert!(d <= max_with_jitter, "attempt {attempt}: {d:?}");
        }
    }

    #[test]
    fn new_rejects_bad_host() {
        let config = ControllerConfig {
            host: "http://pool.local".into(),
            ..ControllerConfig::default()
        };
        assert!(matches!(Controller::new(config), Err(CoreError::Config { .. })));
    }
}

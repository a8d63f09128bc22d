//! TCP push-update listener.
//!
//! Holds one connection to the controller's serial-port interface (TCP port
//! 6000) and turns its unsolicited status lines into [`StatusUpdateEvent`]s
//! in HTTP vocabulary, delivered to a caller-supplied [`UpdateHandler`].
//!
//! The controller sends nothing while the pool is idle, so silence alone says
//! nothing about the link. After [`ListenerConfig::idle_timeout`] without a
//! byte the listener sends `#OPMODE?\r` and expects a line containing
//! `!00 OPMODE=` within [`ListenerConfig::probe_timeout`].
//!
//! The listener never reconnects. Any socket error, peer close, or failed
//! probe ends [`PushListener::run`] with a transient [`Error`]; reconnecting
//! with backoff is the owner's job.
//!
//! # Example
//!
//! ```rust,ignore
//! use autelis_api::listener::{ListenerConfig, PushListener};
//! use autelis_api::ControllerEndpoint;
//! use tokio_util::sync::CancellationToken;
//!
//! let endpoint = ControllerEndpoint::new("192.168.1.20")?;
//! let cancel = CancellationToken::new();
//!
//! let listener = PushListener::connect(&endpoint, ListenerConfig::default()).await?;
//! let handle = listener.spawn(|event| {
//!     println!("{} = {}", event.element, event.value);
//!     true
//! }, cancel.clone());
//!
//! // ... later
//! handle.shutdown();
//! handle.join().await?;
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::Error;
use crate::transport::ControllerEndpoint;
use crate::vocab::{command_to_element, value_to_text};

// ── Wire constants ───────────────────────────────────────────────────

/// Liveness probe sent after an idle window.
pub const PROBE_MESSAGE: &[u8] = b"#OPMODE?\r";

/// Marker a healthy controller includes in its probe reply.
pub const PROBE_SUCCESS: &[u8] = b"!00 OPMODE=";

/// Bytes requested per socket read. Lines routinely span reads.
const READ_BUFFER_SIZE: usize = 32;

/// Longest line kept while waiting for its terminator.
const MAX_LINE_LENGTH: usize = 256;

static STATUS_UPDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^!00 ([A-Z0-9]+)=([A-Z0-9]+) ?[FC]?\r?\n?$")
        .expect("status update pattern is valid")
});

// ── Events ───────────────────────────────────────────────────────────

/// One field change, already translated into HTTP vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateEvent {
    /// Element name as it appears in `status.xml`, e.g. `"airtemp"`.
    pub element: String,
    /// Element text: `"0"`/`"1"` for switches, numeric text otherwise.
    pub value: String,
}

impl StatusUpdateEvent {
    pub fn new(element: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            value: value.into(),
        }
    }
}

/// A status line as sent on the wire, before translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushMessage<'a> {
    /// Serial command word, e.g. `"AIRTMP"`.
    pub command: &'a str,
    /// Serial value word, e.g. `"ON"` or `"71"`.
    pub value: &'a str,
}

impl PushMessage<'_> {
    /// Match one line against `!00 <CMD>=<VAL> [F|C]`.
    pub fn parse(line: &str) -> Option<PushMessage<'_>> {
        let captures = STATUS_UPDATE.captures(line)?;
        Some(PushMessage {
            command: captures.get(1)?.as_str(),
            value: captures.get(2)?.as_str(),
        })
    }

    /// Translate into the HTTP vocabulary.
    pub fn to_event(&self) -> StatusUpdateEvent {
        StatusUpdateEvent {
            element: command_to_element(self.command),
            value: value_to_text(self.value).into_owned(),
        }
    }
}

// ── Handler ──────────────────────────────────────────────────────────

/// Receives translated updates in wire order.
///
/// Returns `true` if the update was applied. A `false` is logged and the
/// listener carries on.
pub trait UpdateHandler: Send {
    fn handle(&mut self, event: StatusUpdateEvent) -> bool;
}

impl<F> UpdateHandler for F
where
    F: FnMut(StatusUpdateEvent) -> bool + Send,
{
    fn handle(&mut self, event: StatusUpdateEvent) -> bool {
        self(event)
    }
}

// ── Configuration ────────────────────────────────────────────────────

/// Timing of the receive loop.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Silence tolerated before probing the controller. Default: 600s.
    pub idle_timeout: Duration,

    /// Time allowed for the probe reply. Default: 2s.
    pub probe_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(600),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

// ── Connection state ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Disconnected,
    Connected,
    Probing,
    Failed,
}

enum ProbeOutcome {
    Alive,
    Cancelled,
}

// ── PushListener ─────────────────────────────────────────────────────

/// An open push-update connection.
pub struct PushListener {
    stream: TcpStream,
    peer: String,
    config: ListenerConfig,
    state: ConnectionState,
    lines: LineBuffer,
}

impl PushListener {
    /// Open the TCP connection to the controller's push port.
    pub async fn connect(
        endpoint: &ControllerEndpoint,
        config: ListenerConfig,
    ) -> Result<Self, Error> {
        let addr = endpoint.tcp_addr();
        info!(addr = %addr, "connecting to controller push port");

        let stream = TcpStream::connect(&addr).await.map_err(|source| {
            warn!(addr = %addr, error = %source, "unable to open TCP connection to controller");
            Error::Connect {
                addr: addr.clone(),
                source,
            }
        })?;

        let mut listener = Self {
            stream,
            peer: addr,
            config,
            state: ConnectionState::Disconnected,
            lines: LineBuffer::default(),
        };
        listener.transition(ConnectionState::Connected);
        Ok(listener)
    }

    /// Address of the controller push port.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Receive updates until cancelled or the connection fails.
    ///
    /// Returns `Ok(())` after cancellation. Every `Err` means the connection
    /// is gone; the socket is closed before this returns either way.
    pub async fn run<H: UpdateHandler + ?Sized>(
        mut self,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let result = self.receive_loop(handler, cancel).await;

        match &result {
            Ok(()) => {
                self.transition(ConnectionState::Disconnected);
                debug!(peer = %self.peer, "push listener cancelled");
            }
            Err(e) => {
                self.transition(ConnectionState::Failed);
                warn!(peer = %self.peer, error = %e, "push connection failed, closing");
            }
        }

        // Best effort: the socket closes on drop regardless.
        let _ = self.stream.shutdown().await;
        result
    }

    /// Run on a background task. See [`run`](Self::run).
    pub fn spawn<H>(self, mut handler: H, cancel: CancellationToken) -> ListenerHandle
    where
        H: UpdateHandler + 'static,
    {
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move { self.run(&mut handler, &task_cancel).await });
        ListenerHandle { task, cancel }
    }

    async fn receive_loop<H: UpdateHandler + ?Sized>(
        &mut self,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let idle_timeout = self.config.idle_timeout;

        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                read = tokio::time::timeout(idle_timeout, self.stream.read(&mut buf)) => read,
            };

            match read {
                Err(_elapsed) => match self.probe(handler, cancel).await? {
                    ProbeOutcome::Alive => {}
                    ProbeOutcome::Cancelled => return Ok(()),
                },
                Ok(Ok(0)) => return Err(Error::ConnectionClosed),
                Ok(Ok(n)) => {
                    trace!(bytes = n, "push data received");
                    for line in self.lines.push(&buf[..n]) {
                        if cancel.is_cancelled() {
                            return Ok(());
                        }
                        dispatch_line(&line, handler);
                    }
                }
                Ok(Err(e)) => return Err(Error::Socket(e)),
            }
        }
    }

    /// Send the liveness probe and wait for its reply.
    ///
    /// The reply is itself a status line, so once the marker is seen the
    /// buffered bytes go through the normal line path along with anything
    /// that arrived behind them.
    async fn probe<H: UpdateHandler + ?Sized>(
        &mut self,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<ProbeOutcome, Error> {
        self.transition(ConnectionState::Probing);
        debug!(
            idle_secs = self.config.idle_timeout.as_secs(),
            "no push data within idle window, probing controller"
        );

        if self.lines.clear() > 0 {
            debug!("discarding stale partial line before probe");
        }

        self.stream
            .write_all(PROBE_MESSAGE)
            .await
            .map_err(Error::Socket)?;

        let timeout = self.config.probe_timeout;
        let deadline = Instant::now() + timeout;
        let mut reply: Vec<u8> = Vec::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(ProbeOutcome::Cancelled),
                read = tokio::time::timeout_at(deadline, self.stream.read(&mut buf)) => read,
            };

            match read {
                Err(_elapsed) if reply.is_empty() => {
                    return Err(Error::ProbeTimeout {
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    });
                }
                Err(_elapsed) => return Err(probe_rejected(&reply)),
                Ok(Ok(0)) => return Err(Error::ConnectionClosed),
                Ok(Ok(n)) => {
                    reply.extend_from_slice(&buf[..n]);

                    if contains(&reply, PROBE_SUCCESS) {
                        debug!("controller answered probe");
                        self.transition(ConnectionState::Connected);
                        for line in self.lines.push(&reply) {
                            if cancel.is_cancelled() {
                                return Ok(ProbeOutcome::Cancelled);
                            }
                            dispatch_line(&line, handler);
                        }
                        return Ok(ProbeOutcome::Alive);
                    }

                    // A complete line without the marker is a wrong answer.
                    if reply.contains(&b'\n') || reply.len() > MAX_LINE_LENGTH {
                        return Err(probe_rejected(&reply));
                    }
                }
                Ok(Err(e)) => return Err(Error::Socket(e)),
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            trace!(from = ?self.state, to = ?next, peer = %self.peer, "push connection state");
            self.state = next;
        }
    }
}

// ── ListenerHandle ───────────────────────────────────────────────────

/// Handle to a listener running on a background task.
pub struct ListenerHandle {
    task: JoinHandle<Result<(), Error>>,
    cancel: CancellationToken,
}

impl ListenerHandle {
    /// Signal the listener to close its connection and stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Whether the background task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the listener to end and return how it ended.
    ///
    /// A panic inside the handler is re-raised here.
    pub async fn join(self) -> Result<(), Error> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(()),
        }
    }
}

// ── Line handling ────────────────────────────────────────────────────

/// Parse one complete line and hand the result to `handler`.
fn dispatch_line<H: UpdateHandler + ?Sized>(line: &str, handler: &mut H) {
    let text = line.trim_end();
    if text.is_empty() {
        return;
    }

    let Some(message) = PushMessage::parse(line) else {
        warn!(message = %text, "invalid status message received from controller");
        return;
    };

    debug!(
        command = message.command,
        value = message.value,
        "status update received from controller"
    );

    if !handler.handle(message.to_event()) {
        warn!(command = message.command, "unhandled status update from controller");
    }
}

/// Reassembles newline-terminated lines from arbitrarily split reads.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append `bytes` and drain every complete line, terminator included.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }

        if self.pending.len() > MAX_LINE_LENGTH {
            warn!(
                bytes = self.pending.len(),
                "discarding unterminated push data"
            );
            self.pending.clear();
        }

        lines
    }

    /// Drop any partial line. Returns how many bytes were dropped.
    fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn probe_rejected(reply: &[u8]) -> Error {
    Error::ProbeRejected {
        reply: String::from_utf8_lossy(reply).trim_end().to_owned(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_listener_config() {
        let config = ListenerConfig::default();
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
        assert_eq!(config.probe_timeout, Duration::from_secs(2));
    }

    #[test]
    fn parses_temperature_line_with_unit() {
        let msg = PushMessage::parse("!00 AIRTMP=71 F\r\n").unwrap();
        assert_eq!(msg.command, "AIRTMP");
        assert_eq!(msg.value, "71");
        assert_eq!(msg.to_event(), StatusUpdateEvent::new("airtemp", "71"));
    }

    #[test]
    fn parses_switch_line() {
        let msg = PushMessage::parse("!00 CIR42=ON\r\n").unwrap();
        assert_eq!(msg.to_event(), StatusUpdateEvent::new("feature2", "1"));

        let msg = PushMessage::parse("!00 AUX1=OFF\r\n").unwrap();
        assert_eq!(msg.to_event(), StatusUpdateEvent::new("aux1", "0"));
    }

    #[test]
    fn parses_celsius_unit_without_space() {
        let msg = PushMessage::parse("!00 SPATMP=38C\r\n").unwrap();
        assert_eq!(msg.value, "38C");

        let msg = PushMessage::parse("!00 SPATMP=38 C\r\n").unwrap();
        assert_eq!(msg.value, "38");
    }

    #[test]
    fn rejects_noise() {
        assert!(PushMessage::parse("?01 ERROR\r\n").is_none());
        assert!(PushMessage::parse("!00 airtmp=71\r\n").is_none());
        assert!(PushMessage::parse("!00 AIRTMP=-4 F\r\n").is_none());
        assert!(PushMessage::parse("garbage !00 AIRTMP=71\r\n").is_none());
        assert!(PushMessage::parse("!00 AIRTMP=71 F trailing\r\n").is_none());
    }

    #[test]
    fn line_buffer_reassembles_split_reads() {
        let mut lines = LineBuffer::default();
        assert!(lines.push(b"!00 AIRT").is_empty());
        assert!(lines.push(b"MP=71 F\r").is_empty());
        assert_eq!(lines.push(b"\n!00 PUMP=ON\r\n!00 SP"), [
            "!00 AIRTMP=71 F\r\n",
            "!00 PUMP=ON\r\n",
        ]);
        assert_eq!(lines.push(b"A=OFF\r\n"), ["!00 SPA=OFF\r\n"]);
        assert_eq!(lines.clear(), 0);
    }

    #[test]
    fn line_buffer_drops_runaway_data() {
        let mut lines = LineBuffer::default();
        let junk = vec![b'x'; MAX_LINE_LENGTH + 1];
        assert!(lines.push(&junk).is_empty());
        assert_eq!(lines.clear(), 0);
    }

    #[test]
    fn dispatch_translates_and_reports_rejections() {
        let mut seen = Vec::new();
        let mut handler = |event: StatusUpdateEvent| {
            let known = event.element != "mystery";
            seen.push(event);
            known
        };

        dispatch_line("!00 WFALL=ON\r\n", &mut handler);
        dispatch_line("!00 MYSTERY=1\r\n", &mut handler);
        dispatch_line("not a status line\r\n", &mut handler);
        dispatch_line("\r\n", &mut handler);

        assert_eq!(seen, [
            StatusUpdateEvent::new("waterfall", "1"),
            StatusUpdateEvent::new("mystery", "1"),
        ]);
    }

    #[test]
    fn contains_finds_probe_marker_anywhere() {
        assert!(contains(b"\r\n!00 OPMODE=AUTO\r\n", PROBE_SUCCESS));
        assert!(!contains(b"!00 OPMODE", PROBE_SUCCESS));
        assert!(!contains(b"", PROBE_SUCCESS));
    }
}

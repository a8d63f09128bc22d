// Integration tests for `PushListener` against a fake controller socket.

use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use autelis_api::listener::{PROBE_MESSAGE, PROBE_SUCCESS};
use autelis_api::{ControllerEndpoint, Error, ListenerConfig, PushListener, StatusUpdateEvent};

// ── Helpers ─────────────────────────────────────────────────────────

async fn fake_controller() -> (TcpListener, ControllerEndpoint) {
    let socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    let endpoint = ControllerEndpoint::new("127.0.0.1")
        .unwrap()
        .with_tcp_port(port);
    (socket, endpoint)
}

fn quick_probe() -> ListenerConfig {
    ListenerConfig {
        idle_timeout: Duration::from_millis(150),
        probe_timeout: Duration::from_millis(300),
    }
}

/// A handler that forwards every event and accepts it.
fn forwarding() -> (
    impl FnMut(StatusUpdateEvent) -> bool + Send + 'static,
    mpsc::UnboundedReceiver<StatusUpdateEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (move |event| tx.send(event).is_ok(), rx)
}

async fn read_probe(stream: &mut TcpStream) {
    let mut probe = vec![0u8; PROBE_MESSAGE.len()];
    stream.read_exact(&mut probe).await.unwrap();
    assert_eq!(probe, PROBE_MESSAGE);
}

/// Read until the client closes its side; returns the final read size.
async fn read_until_closed(stream: &mut TcpStream) -> usize {
    let mut buf = [0u8; 64];
    loop {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        if n == 0 {
            return n;
        }
    }
}

// ── Delivery ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_updates_arrive_translated_and_in_order() {
    let (socket, endpoint) = fake_controller().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = socket.accept().await.unwrap();
        // Lines deliberately split across writes.
        for chunk in [
            &b"!00 AIRTMP=71 F\r\n!00 CI"[..],
            b"R41=ON\r\n!00 POOL",
            b"TMP=80 F\r\n!00 OPMODE=SERVICE\r\n",
        ] {
            stream.write_all(chunk).await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    });

    let listener = PushListener::connect(&endpoint, ListenerConfig::default())
        .await
        .unwrap();
    let (mut handler, mut rx) = forwarding();
    let result = listener.run(&mut handler, &CancellationToken::new()).await;
    server.await.unwrap();

    assert!(matches!(result, Err(Error::ConnectionClosed)));

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events, [
        StatusUpdateEvent::new("airtemp", "71"),
        StatusUpdateEvent::new("feature1", "1"),
        StatusUpdateEvent::new("pooltemp", "80"),
        StatusUpdateEvent::new("opmode", "1"),
    ]);
}

#[tokio::test]
async fn test_noise_and_rejected_updates_do_not_stop_listener() {
    let (socket, endpoint) = fake_controller().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = socket.accept().await.unwrap();
        stream
            .write_all(b"hello\r\n!00 BOGUS=1\r\n?01 ERR\r\n!00 PUMP=ON\r\n")
            .await
            .unwrap();
    });

    let listener = PushListener::connect(&endpoint, ListenerConfig::default())
        .await
        .unwrap();

    let mut seen = Vec::new();
    let mut handler = |event: StatusUpdateEvent| {
        let known = event.element != "bogus";
        seen.push(event.element);
        known
    };
    let result = listener.run(&mut handler, &CancellationToken::new()).await;
    server.await.unwrap();

    assert!(matches!(result, Err(Error::ConnectionClosed)));
    assert_eq!(seen, ["bogus", "pump"]);
}

// ── Liveness probe ──────────────────────────────────────────────────

#[tokio::test]
async fn test_probe_success_keeps_connection() {
    let (socket, endpoint) = fake_controller().await;

    tokio::spawn(async move {
        let (mut stream, _) = socket.accept().await.unwrap();
        read_probe(&mut stream).await;
        stream.write_all(PROBE_SUCCESS).await.unwrap();
        stream.write_all(b"AUTO\r\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        stream.write_all(b"!00 SPA=ON\r\n").await.unwrap();
        // Keep the socket open until the client hangs up.
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest).await;
    });

    let listener = PushListener::connect(&endpoint, quick_probe()).await.unwrap();
    let (handler, mut rx) = forwarding();
    let cancel = CancellationToken::new();
    let handle = listener.spawn(handler, cancel.clone());

    let mut events = Vec::new();
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        events.push(event);
    }
    assert_eq!(events, [
        StatusUpdateEvent::new("opmode", "0"),
        StatusUpdateEvent::new("spa", "1"),
    ]);

    assert!(!handle.is_finished());
    handle.shutdown();
    handle.join().await.unwrap();
}

#[tokio::test]
async fn test_probe_without_reply_times_out() {
    let (socket, endpoint) = fake_controller().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = socket.accept().await.unwrap();
        read_probe(&mut stream).await;
        read_until_closed(&mut stream).await
    });

    let listener = PushListener::connect(&endpoint, quick_probe()).await.unwrap();
    let (mut handler, _rx) = forwarding();
    let result = listener.run(&mut handler, &CancellationToken::new()).await;

    assert!(matches!(result, Err(Error::ProbeTimeout { timeout_ms: 300 })));
    assert_eq!(server.await.unwrap(), 0);
}

#[tokio::test]
async fn test_probe_wrong_reply_is_rejected() {
    let (socket, endpoint) = fake_controller().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = socket.accept().await.unwrap();
        read_probe(&mut stream).await;
        stream.write_all(b"?01 UNKNOWN\r\n").await.unwrap();
        read_until_closed(&mut stream).await
    });

    let listener = PushListener::connect(&endpoint, quick_probe()).await.unwrap();
    let (mut handler, _rx) = forwarding();
    let result = listener.run(&mut handler, &CancellationToken::new()).await;

    match result {
        Err(Error::ProbeRejected { reply }) => assert_eq!(reply, "?01 UNKNOWN"),
        other => panic!("expected ProbeRejected, got {other:?}"),
    }
    assert_eq!(server.await.unwrap(), 0);
}

#[tokio::test]
async fn test_probe_reply_and_push_in_one_write_are_delivered() {
    let (socket, endpoint) = fake_controller().await;

    tokio::spawn(async move {
        let (mut stream, _) = socket.accept().await.unwrap();
        read_probe(&mut stream).await;
        stream
            .write_all(b"!00 OPMODE=AUTO\r\n!00 SPA=ON\r\n")
            .await
            .unwrap();
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest).await;
    });

    let listener = PushListener::connect(&endpoint, quick_probe()).await.unwrap();
    let (handler, mut rx) = forwarding();
    let handle = listener.spawn(handler, CancellationToken::new());

    let mut events = Vec::new();
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .expect("listener dropped the handler");
        events.push(event);
    }
    assert_eq!(events, [
        StatusUpdateEvent::new("opmode", "0"),
        StatusUpdateEvent::new("spa", "1"),
    ]);

    handle.shutdown();
    let _ = handle.join().await;
}

#[tokio::test]
async fn test_peer_close_during_probe_fails() {
    let (socket, endpoint) = fake_controller().await;

    tokio::spawn(async move {
        let (mut stream, _) = socket.accept().await.unwrap();
        read_probe(&mut stream).await;
        drop(stream);
    });

    let listener = PushListener::connect(&endpoint, quick_probe()).await.unwrap();
    let (mut handler, _rx) = forwarding();
    let result = listener.run(&mut handler, &CancellationToken::new()).await;

    let err = result.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {err:?}");
}

// ── Connection lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn test_connect_refused() {
    let port = {
        let socket = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap().port()
    };
    let endpoint = ControllerEndpoint::new("127.0.0.1")
        .unwrap()
        .with_tcp_port(port);

    let result = PushListener::connect(&endpoint, ListenerConfig::default()).await;

    match result {
        Err(err @ Error::Connect { .. }) => assert!(err.is_transient()),
        Err(other) => panic!("expected Connect error, got {other:?}"),
        Ok(_) => panic!("connect unexpectedly succeeded"),
    }
}

#[tokio::test]
async fn test_cancellation_closes_socket() {
    let (socket, endpoint) = fake_controller().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = socket.accept().await.unwrap();
        let mut buf = [0u8; 16];
        // EOF once the client closes its side.
        tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap()
    });

    let listener = PushListener::connect(&endpoint, ListenerConfig::default())
        .await
        .unwrap();
    let (handler, _rx) = forwarding();
    let handle = listener.spawn(handler, CancellationToken::new());

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.shutdown();
    handle.join().await.unwrap();

    assert_eq!(server.await.unwrap(), 0);
}

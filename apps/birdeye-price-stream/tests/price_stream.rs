//! Price Stream Integration Tests
//!
//! Runs the connector and session against a local WebSocket server that
//! checks the handshake, records what the client sends, and scripts the
//! server's frames.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use birdeye_price_stream::application::ports::RejectReason;
use birdeye_price_stream::infrastructure::birdeye::{ApiKey, Scheme};
use birdeye_price_stream::{
    CloseReason, ConnectionTarget, Connector, EventSink, HandshakeMetadata, Session,
    SessionEvent, SessionState, SubscriptionRequest,
};

const TEST_KEY: &str = "test-key";
const ADDRESS: &str = "So11111111111111111111111111111111111111112";

// =============================================================================
// Harness
// =============================================================================

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }
}

/// What the server saw of the client.
#[derive(Debug, Default)]
struct Observed {
    uri: String,
    origin: Option<String>,
    ws_origin: Option<String>,
    protocol: Option<String>,
    first_message: Option<Message>,
    later_messages: Vec<Message>,
}

fn header(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Accept one client, echo the sub-protocol, read the first message, send
/// `script`, then optionally close with code 1000. Collects every message
/// the client sends until the connection ends.
async fn serve_once(
    listener: TcpListener,
    script: Vec<Message>,
    close_after: bool,
) -> Observed {
    let (stream, _) = listener.accept().await.unwrap();
    let (headers_tx, headers_rx) = oneshot::channel();

    let callback = move |req: &Request, mut resp: Response| {
        let seen = Observed {
            uri: req.uri().to_string(),
            origin: header(req, "Origin"),
            ws_origin: header(req, "Sec-WebSocket-Origin"),
            protocol: header(req, "Sec-WebSocket-Protocol"),
            ..Observed::default()
        };
        let _ = headers_tx.send(seen);
        resp.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static("echo-protocol"),
        );
        Ok(resp)
    };

    let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
        .await
        .unwrap();
    let mut observed = headers_rx.await.unwrap();

    observed.first_message = ws.next().await.and_then(Result::ok);

    for msg in script {
        ws.send(msg).await.unwrap();
    }

    if close_after {
        ws.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "bye".into(),
        }))
        .await
        .unwrap();
    }

    while let Some(Ok(msg)) = ws.next().await {
        observed.later_messages.push(msg);
    }

    observed
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();
    (listener, host)
}

fn connector_for(host: &str) -> Connector {
    let target = ConnectionTarget::new(
        Scheme::Ws,
        host,
        "solana",
        ApiKey::new(TEST_KEY).unwrap(),
    )
    .unwrap();
    Connector::new(target, HandshakeMetadata::for_host(host))
        .with_timeout(Duration::from_secs(5))
}

fn text(json: &str) -> Message {
    Message::Text(json.into())
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_handshake_and_subscription_wire_format() {
    let (listener, host) = bind().await;
    let server = tokio::spawn(serve_once(listener, vec![], true));

    let channel = connector_for(&host).connect().await.unwrap();
    let sink = Arc::new(RecordingSink::default());
    let session = Session::new(channel, Arc::clone(&sink), Duration::from_secs(60)).unwrap();
    session
        .run(&SubscriptionRequest::price(ADDRESS))
        .await
        .unwrap();

    let observed = timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(observed.uri, "/socket/solana?x-api-key=test-key");
    let origin = format!("ws://{host}");
    assert_eq!(observed.origin.as_deref(), Some(origin.as_str()));
    assert_eq!(observed.ws_origin.as_deref(), Some(origin.as_str()));
    assert_eq!(observed.protocol.as_deref(), Some("echo-protocol"));

    let Some(Message::Text(first)) = observed.first_message else {
        panic!("first client message was not text");
    };
    assert_eq!(
        first.as_str(),
        r#"{"type":"SUBSCRIBE_PRICE","data":{"queryType":"simple","chartType":"1m","address":"So11111111111111111111111111111111111111112","currency":"usd"}}"#
    );
}

#[tokio::test]
async fn test_scripted_frames_then_remote_close() {
    let (listener, host) = bind().await;
    let price = r#"{"type":"PRICE_DATA","data":{"o":1,"h":2,"l":0.5,"c":1.5,"v":100,"symbol":"SOL","unixTime":1700000000000}}"#;
    let script = vec![
        text(r#"{"type":"WELCOME"}"#),
        text(price),
        text("not json"),
        text(r#"{"data":{}}"#),
        text(r#"{"type":"TXS_DATA","data":{}}"#),
        Message::Binary(price.as_bytes().to_vec().into()),
        Message::Ping(b"hb".to_vec().into()),
    ];
    let server = tokio::spawn(serve_once(listener, script, true));

    let channel = connector_for(&host).connect().await.unwrap();
    let sink = Arc::new(RecordingSink::default());
    let session = Session::new(channel, Arc::clone(&sink), Duration::from_secs(60)).unwrap();
    let summary = session
        .run(&SubscriptionRequest::price(ADDRESS))
        .await
        .unwrap();

    assert_eq!(
        summary.close_reason,
        CloseReason::RemoteClosed {
            code: Some(1000),
            reason: "bye".to_string()
        }
    );
    assert_eq!(summary.frames_received, 6);
    assert_eq!(summary.welcomes, 1);
    assert_eq!(summary.price_updates, 2);
    assert_eq!(summary.unhandled, 1);
    assert_eq!(summary.rejected, 2);

    let events = sink.events();
    assert_eq!(events.len(), 6);
    assert_eq!(events[0], SessionEvent::Welcome);
    let SessionEvent::PriceUpdate(update) = &events[1] else {
        panic!("expected price update, got {:?}", events[1]);
    };
    assert_eq!(update.symbol.as_deref(), Some("SOL"));
    assert_eq!(update.instant_rfc3339().as_deref(), Some("2023-11-14T22:13:20Z"));
    assert!(matches!(
        events[2],
        SessionEvent::FrameRejected(RejectReason::Malformed(_))
    ));
    assert_eq!(events[3], SessionEvent::FrameRejected(RejectReason::MissingType));
    assert_eq!(
        events[4],
        SessionEvent::Unhandled {
            message_type: "TXS_DATA".to_string()
        }
    );
    assert_eq!(events[5], events[1]);

    let observed = timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(
        observed
            .later_messages
            .iter()
            .any(|m| matches!(m, Message::Pong(data) if &data[..] == b"hb"))
    );
}

#[tokio::test]
async fn test_watchdog_closes_pending_receive() {
    let (listener, host) = bind().await;
    let server = tokio::spawn(serve_once(
        listener,
        vec![text(r#"{"type":"WELCOME"}"#)],
        false,
    ));

    let channel = connector_for(&host).connect().await.unwrap();
    let sink = Arc::new(RecordingSink::default());
    let session =
        Session::new(channel, Arc::clone(&sink), Duration::from_millis(200)).unwrap();

    let summary = timeout(
        Duration::from_secs(5),
        session.run(&SubscriptionRequest::price(ADDRESS)),
    )
    .await
    .expect("watchdog should end the session")
    .unwrap();

    assert_eq!(summary.close_reason, CloseReason::WatchdogExpired);
    assert_eq!(summary.state, SessionState::Closed);
    assert_eq!(summary.welcomes, 1);
    assert_eq!(sink.events(), vec![SessionEvent::Welcome]);

    let observed = timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(observed.later_messages.iter().any(Message::is_close));
}

#[tokio::test]
async fn test_external_close_is_shutdown() {
    let (listener, host) = bind().await;
    let server = tokio::spawn(serve_once(listener, vec![], false));

    let channel = connector_for(&host).connect().await.unwrap();
    let session = Session::new(
        channel,
        Arc::new(RecordingSink::default()),
        Duration::from_secs(3600),
    )
    .unwrap();
    let closer = session.closer();

    let run = tokio::spawn(async move { session.run(&SubscriptionRequest::price(ADDRESS)).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(closer.close());
    assert!(!closer.close());

    let summary = timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(summary.close_reason, CloseReason::Shutdown);

    let observed = timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(observed.later_messages.iter().any(Message::is_close));
}

#[tokio::test]
async fn test_rejected_handshake_reports_status() {
    let (listener, host) = bind().await;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let mut read = 0;
        while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf[read..]).await.unwrap();
            if n == 0 {
                break;
            }
            read += n;
        }
        stream
            .write_all(b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        stream.flush().await.unwrap();
    });

    let err = connector_for(&host).connect().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("401"));

    server.await.unwrap();
}

#[tokio::test]
async fn test_missing_subprotocol_echo_fails_handshake() {
    let (listener, host) = bind().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        // Plain accept does not echo the requested sub-protocol.
        let _ = tokio_tungstenite::accept_async(stream).await;
    });

    let err = connector_for(&host).connect().await.unwrap_err();
    assert_eq!(err.status(), None);

    let _ = timeout(Duration::from_secs(5), server).await;
}

#[tokio::test]
async fn test_connection_refused_is_error() {
    let (listener, host) = bind().await;
    drop(listener);

    let result = connector_for(&host).connect().await;
    assert!(result.is_err());
}

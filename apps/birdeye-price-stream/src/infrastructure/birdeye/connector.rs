//! Birdeye WebSocket Connector
//!
//! Builds the connection target, attaches the handshake headers the
//! Birdeye socket requires, and performs a single handshake attempt.
//!
//! # Stream URL
//!
//! `wss://public-api.birdeye.so/socket/<chain>?x-api-key=<key>`
//!
//! # Handshake Headers
//!
//! - `Origin: ws://public-api.birdeye.so`
//! - `Sec-WebSocket-Origin: ws://public-api.birdeye.so`
//! - `Sec-WebSocket-Protocol: echo-protocol`
//!
//! The server must echo the `echo-protocol` sub-protocol; a response
//! without it fails the handshake.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::ports::{ChannelCloser, ChannelError, CloseCause, Frame, MessageChannel};

// =============================================================================
// Constants
// =============================================================================

/// Default Birdeye public API host.
pub const DEFAULT_HOST: &str = "public-api.birdeye.so";

/// Sub-protocol the Birdeye socket negotiates.
pub const SUB_PROTOCOL: &str = "echo-protocol";

/// Query parameter carrying the API key.
pub const API_KEY_PARAM: &str = "x-api-key";

/// Upper bound on the handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on sending our close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur while connecting.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Connection target is unusable.
    #[error("invalid connection target: {0}")]
    InvalidTarget(String),

    /// Handshake header is unusable.
    #[error("invalid handshake header: {0}")]
    InvalidHeader(String),

    /// Handshake did not complete in time.
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    /// Handshake failed.
    #[error("handshake failed{}: {source}", status_suffix(.status))]
    Handshake {
        /// HTTP status of the server's response, when it sent one.
        status: Option<u16>,
        /// Underlying WebSocket error.
        #[source]
        source: tungstenite::Error,
    },
}

impl ConnectionError {
    /// HTTP status of a rejected handshake, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Handshake { status, .. } => *status,
            _ => None,
        }
    }
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl From<tungstenite::Error> for ConnectionError {
    fn from(source: tungstenite::Error) -> Self {
        let status = match &source {
            tungstenite::Error::Http(response) => Some(response.status().as_u16()),
            _ => None,
        };
        Self::Handshake { status, source }
    }
}

// =============================================================================
// Connection Target
// =============================================================================

/// URL scheme of the connection target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    /// Plain WebSocket.
    Ws,
    /// WebSocket over TLS.
    #[default]
    Wss,
}

impl Scheme {
    /// Get the scheme name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ws => "ws",
            Self::Wss => "wss",
        }
    }
}

/// Birdeye API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Create an API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty or blank.
    pub fn new(key: impl Into<String>) -> Result<Self, ConnectionError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConnectionError::InvalidTarget(
                "API key cannot be empty".to_string(),
            ));
        }
        Ok(Self(key))
    }

    /// Get the raw key.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Where to connect: endpoint plus embedded credential.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    scheme: Scheme,
    host: String,
    chain: String,
    api_key: ApiKey,
}

impl ConnectionTarget {
    /// Create a connection target.
    ///
    /// # Errors
    ///
    /// Returns an error if the host or chain is empty.
    pub fn new(
        scheme: Scheme,
        host: impl Into<String>,
        chain: impl Into<String>,
        api_key: ApiKey,
    ) -> Result<Self, ConnectionError> {
        let host = host.into();
        let chain = chain.into();

        if host.trim().is_empty() {
            return Err(ConnectionError::InvalidTarget(
                "host cannot be empty".to_string(),
            ));
        }
        if chain.trim().is_empty() {
            return Err(ConnectionError::InvalidTarget(
                "chain cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            scheme,
            host,
            chain,
            api_key,
        })
    }

    /// Target on the public Birdeye host over TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain is empty.
    pub fn birdeye(chain: impl Into<String>, api_key: ApiKey) -> Result<Self, ConnectionError> {
        Self::new(Scheme::Wss, DEFAULT_HOST, chain, api_key)
    }

    /// Full connection URL with the API key substituted verbatim.
    #[must_use]
    pub fn url(&self) -> String {
        self.format_url(self.api_key.expose())
    }

    /// Connection URL safe for logs.
    #[must_use]
    pub fn redacted_url(&self) -> String {
        self.format_url("[REDACTED]")
    }

    fn format_url(&self, key: &str) -> String {
        format!(
            "{}://{}/socket/{}?{API_KEY_PARAM}={key}",
            self.scheme.as_str(),
            self.host,
            self.chain
        )
    }

    /// Get the scheme.
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Get the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the chain identifier.
    #[must_use]
    pub fn chain(&self) -> &str {
        &self.chain
    }
}

// =============================================================================
// Handshake Metadata
// =============================================================================

/// Ordered handshake headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeMetadata {
    headers: Vec<(String, String)>,
}

impl HandshakeMetadata {
    /// Create empty metadata.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Headers the Birdeye socket expects for `host`.
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        let origin = format!("ws://{host}");
        Self::new()
            .with_header("Origin", origin.clone())
            .with_header("Sec-WebSocket-Origin", origin)
            .with_header("Sec-WebSocket-Protocol", SUB_PROTOCOL)
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value (case-insensitive name).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Check if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Performs the WebSocket handshake.
#[derive(Debug, Clone)]
pub struct Connector {
    target: ConnectionTarget,
    metadata: HandshakeMetadata,
    timeout: Duration,
}

impl Connector {
    /// Create a connector.
    #[must_use]
    pub const fn new(target: ConnectionTarget, metadata: HandshakeMetadata) -> Self {
        Self {
            target,
            metadata,
            timeout: CONNECT_TIMEOUT,
        }
    }

    /// Override the handshake timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect once. There is no retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built, the handshake fails
    /// or is rejected, or it does not finish within the timeout.
    pub async fn connect(
        &self,
    ) -> Result<WebSocketChannel<MaybeTlsStream<TcpStream>>, ConnectionError> {
        if self.metadata.is_empty() {
            return Err(ConnectionError::InvalidHeader(
                "no handshake headers configured".to_string(),
            ));
        }

        let mut request = self
            .target
            .url()
            .into_client_request()
            .map_err(|e| ConnectionError::InvalidTarget(e.to_string()))?;

        for (name, value) in self.metadata.iter() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConnectionError::InvalidHeader(format!("{name}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ConnectionError::InvalidHeader(format!("{name}: {e}")))?;
            request.headers_mut().insert(header_name, header_value);
        }

        tracing::info!(url = %self.target.redacted_url(), "Connecting to price stream");

        let (stream, response) =
            tokio::time::timeout(self.timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| ConnectionError::Timeout(self.timeout))??;

        tracing::info!(status = response.status().as_u16(), "WebSocket client connected");

        Ok(WebSocketChannel::new(stream))
    }
}

// =============================================================================
// WebSocket Channel
// =============================================================================

/// `MessageChannel` over a tokio-tungstenite stream.
///
/// Answers pings itself and surfaces only text and binary frames.
#[derive(Debug)]
pub struct WebSocketChannel<S> {
    stream: WebSocketStream<S>,
    closer: ChannelCloser,
    close_sent: bool,
}

impl<S> WebSocketChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an open WebSocket stream.
    #[must_use]
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self {
            stream,
            closer: ChannelCloser::new(),
            close_sent: false,
        }
    }

    /// Send our close frame, at most once.
    async fn shutdown(&mut self) {
        if self.close_sent {
            return;
        }
        self.close_sent = true;

        match tokio::time::timeout(CLOSE_TIMEOUT, self.stream.close(None)).await {
            Ok(Ok(())) => tracing::debug!("Close frame sent"),
            Ok(Err(e)) => tracing::debug!(error = %e, "Close frame not sent"),
            Err(_) => tracing::debug!("Timed out sending close frame"),
        }
    }
}

#[async_trait]
impl<S> MessageChannel for WebSocketChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        if self.closer.is_closed() {
            return Err(ChannelError::Closed(CloseCause::Local));
        }
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(channel_error)
    }

    async fn recv(&mut self) -> Result<Frame, ChannelError> {
        loop {
            let next = tokio::select! {
                biased;
                () = self.closer.closed() => None,
                msg = self.stream.next() => Some(msg),
            };

            let Some(msg) = next else {
                self.shutdown().await;
                return Err(ChannelError::Closed(CloseCause::Local));
            };

            match msg {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.to_string())),
                Some(Ok(Message::Binary(bytes))) => return Ok(Frame::Binary(bytes.to_vec())),
                Some(Ok(Message::Ping(data))) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(channel_error)?;
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame.map_or((None, String::new()), |f| {
                        (Some(u16::from(f.code)), f.reason.to_string())
                    });
                    return Err(ChannelError::Closed(CloseCause::Remote { code, reason }));
                }
                Some(Ok(_)) => {
                    // Pong and raw frames carry no data
                }
                Some(Err(e)) => return Err(channel_error(e)),
                None => return Err(ChannelError::Closed(CloseCause::Eof)),
            }
        }
    }

    fn closer(&self) -> ChannelCloser {
        self.closer.clone()
    }
}

fn channel_error(e: tungstenite::Error) -> ChannelError {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            ChannelError::Closed(CloseCause::Eof)
        }
        other => ChannelError::Transport(Box::new(other)),
    }
}

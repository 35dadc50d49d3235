//! Port Interfaces
//!
//! Defines the interfaces (ports) the session loop depends on, following
//! the Hexagonal Architecture pattern. Infrastructure adapters implement
//! them; tests substitute scripted fakes.
//!
//! ## Driven Ports (Outbound)
//!
//! - `MessageChannel`: Full-duplex message channel to the price service
//! - `EventSink`: Output collaborator that displays session events

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::market::PriceUpdate;

// =============================================================================
// Message Channel
// =============================================================================

/// A frame received from the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl Frame {
    /// Raw frame payload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// Which side closed the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseCause {
    /// Closed through this channel's `ChannelCloser`.
    Local,
    /// The server sent a close frame.
    Remote {
        /// Close code, if any.
        code: Option<u16>,
        /// Close reason text.
        reason: String,
    },
    /// The underlying stream ended without a close frame.
    Eof,
}

/// Errors returned by a `MessageChannel`.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The channel is closed.
    #[error("connection closed: {0:?}")]
    Closed(CloseCause),

    /// Transport failure.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// One-shot, idempotent close signal for a `MessageChannel`.
///
/// Cloned handles share state. Closing wakes any receive in flight on the
/// owning channel, which then returns `ChannelError::Closed(CloseCause::Local)`.
#[derive(Debug, Clone, Default)]
pub struct ChannelCloser {
    token: CancellationToken,
    closed: Arc<AtomicBool>,
}

impl ChannelCloser {
    /// Create a new, open closer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the channel.
    ///
    /// Returns `true` only for the call that actually closed it; later
    /// calls are no-ops and return `false`.
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        self.token.cancel();
        first
    }

    /// Check if the channel has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        self.token.cancelled().await;
    }
}

/// Full-duplex message channel to the price service.
///
/// A channel has one sender, one receiver and any number of closers.
/// `recv` must return `ChannelError::Closed` promptly when a closer fires
/// while a receive is pending.
#[async_trait]
pub trait MessageChannel: Send {
    /// Send one text message.
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError>;

    /// Wait for the next data frame.
    async fn recv(&mut self) -> Result<Frame, ChannelError>;

    /// Handle that closes this channel.
    fn closer(&self) -> ChannelCloser;
}

// =============================================================================
// Event Sink
// =============================================================================

/// Why an inbound frame was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Frame is not a JSON document.
    Malformed(String),
    /// Frame has no string `type` field.
    MissingType,
    /// Known message type with an unusable payload.
    InvalidPayload {
        /// Message type of the frame.
        message_type: String,
        /// What was wrong with it.
        detail: String,
    },
}

impl RejectReason {
    /// Short label used for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::MissingType => "missing_type",
            Self::InvalidPayload { .. } => "invalid_payload",
        }
    }
}

/// Event emitted by the session loop to the output collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Server welcome message.
    Welcome,
    /// Price update.
    PriceUpdate(PriceUpdate),
    /// Message of a type this client does not handle.
    Unhandled {
        /// Raw `type` value.
        message_type: String,
    },
    /// Frame skipped because it could not be decoded.
    FrameRejected(RejectReason),
}

/// Output collaborator for session events.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Display or record one event.
    fn emit(&self, event: SessionEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: SessionEvent) {
        (**self).emit(event);
    }
}

//! Price Stream Session
//!
//! Owns an open channel for the lifetime of one session:
//!
//! 1. Sends the subscription request as the first message.
//! 2. Starts the watchdog that closes the channel after the session duration.
//! 3. Receives frames one at a time, decodes and classifies each by its
//!    `type` field, and emits one event per frame to the sink.
//!
//! A frame that fails to decode is reported and skipped. The first receive
//! error (transport failure, remote close, or the watchdog's close) ends
//! the loop; there is no reconnect.

use std::time::{Duration, Instant};

use uuid::Uuid;

use super::codec::{CodecError, JsonCodec};
use super::messages::{InboundMessage, SubscriptionRequest};
use super::watchdog::{Watchdog, WatchdogOutcome};
use crate::application::ports::{
    ChannelCloser, ChannelError, CloseCause, EventSink, Frame, MessageChannel, SessionEvent,
};
use crate::domain::session::{
    CloseReason, InvalidTransition, SessionState, SessionSummary, SessionTransition,
};
use crate::infrastructure::metrics;

// =============================================================================
// Error Type
// =============================================================================

/// Fatal session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Subscription request could not be encoded.
    #[error("failed to encode subscription: {0}")]
    Encode(#[from] CodecError),

    /// Subscription request could not be sent.
    #[error("failed to send subscription: {0}")]
    Send(#[source] ChannelError),

    /// Lifecycle violated.
    #[error(transparent)]
    InvalidState(#[from] InvalidTransition),
}

// =============================================================================
// Frame Classification
// =============================================================================

/// Decode one frame and map it to the event the sink should receive.
#[must_use]
pub fn classify_frame(codec: &JsonCodec, frame: &Frame) -> SessionEvent {
    match codec.decode(frame.as_bytes()) {
        Ok(InboundMessage::Welcome) => SessionEvent::Welcome,
        Ok(InboundMessage::PriceData(update)) => SessionEvent::PriceUpdate(update),
        Ok(InboundMessage::Unknown(message_type)) => SessionEvent::Unhandled { message_type },
        Err(e) => SessionEvent::FrameRejected(e.into()),
    }
}

// =============================================================================
// Session
// =============================================================================

#[derive(Debug, Default)]
struct Counters {
    frames_received: u64,
    price_updates: u64,
    welcomes: u64,
    unhandled: u64,
    rejected: u64,
}

impl Counters {
    const fn into_summary(
        self,
        elapsed: Duration,
        close_reason: CloseReason,
        state: SessionState,
    ) -> SessionSummary {
        SessionSummary {
            frames_received: self.frames_received,
            price_updates: self.price_updates,
            welcomes: self.welcomes,
            unhandled: self.unhandled,
            rejected: self.rejected,
            elapsed,
            close_reason,
            state,
        }
    }
}

/// One price stream session over an open channel.
pub struct Session<C, K> {
    id: Uuid,
    channel: C,
    sink: K,
    codec: JsonCodec,
    duration: Duration,
    state: SessionState,
}

impl<C, K> Session<C, K>
where
    C: MessageChannel,
    K: EventSink,
{
    /// Create a session over a channel whose handshake has completed.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the `Connecting → Subscribing` transition
    /// is always valid for a fresh session.
    pub fn new(channel: C, sink: K, duration: Duration) -> Result<Self, SessionError> {
        let state = SessionState::Connecting.transition(SessionTransition::HandshakeSucceeded)?;
        Ok(Self {
            id: Uuid::new_v4(),
            channel,
            sink,
            codec: JsonCodec::new(),
            duration,
            state,
        })
    }

    /// Handle that closes the channel, e.g. on Ctrl+C.
    #[must_use]
    pub fn closer(&self) -> ChannelCloser {
        self.channel.closer()
    }

    /// Subscribe, then stream until the channel closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription request cannot be encoded or
    /// sent. Receive errors end the session normally and are reported in
    /// the returned summary, as is a local close that lands before the
    /// subscription goes out.
    #[tracing::instrument(name = "session", skip_all, fields(session_id = %self.id, address = request.address()))]
    pub async fn run(mut self, request: &SubscriptionRequest) -> Result<SessionSummary, SessionError> {
        if let Err(e) = self.subscribe(request).await {
            let state = self.state.transition(SessionTransition::Failed)?;
            if matches!(e, SessionError::Send(ChannelError::Closed(CloseCause::Local))) {
                let close_reason = CloseReason::Shutdown;
                tracing::info!(reason = %close_reason, "Connection closed");
                return Ok(Counters::default().into_summary(Duration::ZERO, close_reason, state));
            }
            tracing::error!(error = %e, "Subscription failed");
            return Err(e);
        }
        self.state = self.state.transition(SessionTransition::SubscriptionSent)?;

        let watchdog = Watchdog::new(self.duration, self.channel.closer()).spawn();
        let started = Instant::now();
        metrics::set_connected(true);

        let mut counters = Counters::default();
        let close = loop {
            match self.channel.recv().await {
                Ok(frame) => self.dispatch(&frame, &mut counters),
                Err(e) => break e,
            }
        };

        let close_reason = match close {
            // Any local close also wakes the watchdog, so this join is prompt.
            ChannelError::Closed(CloseCause::Local) => match watchdog.await {
                Ok(WatchdogOutcome::Expired) => CloseReason::WatchdogExpired,
                _ => CloseReason::Shutdown,
            },
            other => {
                watchdog.abort();
                close_reason(other)
            }
        };

        let state = self.state.transition(SessionTransition::Terminated)?;
        let elapsed = started.elapsed();
        metrics::set_connected(false);
        metrics::record_session_duration(elapsed);

        if close_reason.is_graceful() {
            tracing::info!(reason = %close_reason, "Connection closed");
        } else {
            tracing::warn!(reason = %close_reason, "Connection error");
        }

        Ok(counters.into_summary(elapsed, close_reason, state))
    }

    async fn subscribe(&mut self, request: &SubscriptionRequest) -> Result<(), SessionError> {
        let json = self.codec.encode(request)?;

        tracing::debug!(
            address = request.address(),
            chart_type = %request.data.chart_type,
            "Sending subscribe request"
        );

        self.channel
            .send_text(json)
            .await
            .map_err(SessionError::Send)
    }

    fn dispatch(&self, frame: &Frame, counters: &mut Counters) {
        counters.frames_received += 1;
        metrics::record_frame_received();

        if let Frame::Text(text) = frame {
            tracing::debug!(frame = %text, "Received frame");
        } else {
            tracing::debug!(bytes = frame.as_bytes().len(), "Received binary frame");
        }

        let event = classify_frame(&self.codec, frame);
        match &event {
            SessionEvent::Welcome => counters.welcomes += 1,
            SessionEvent::PriceUpdate(_) => {
                counters.price_updates += 1;
                metrics::record_price_update();
            }
            SessionEvent::Unhandled { message_type } => {
                counters.unhandled += 1;
                metrics::record_unhandled_message(message_type);
            }
            SessionEvent::FrameRejected(reason) => {
                counters.rejected += 1;
                metrics::record_frame_rejected(reason.label());
            }
        }

        self.sink.emit(event);
    }
}

fn close_reason(err: ChannelError) -> CloseReason {
    match err {
        ChannelError::Closed(CloseCause::Local) => CloseReason::Shutdown,
        ChannelError::Closed(CloseCause::Remote { code, reason }) => {
            CloseReason::RemoteClosed { code, reason }
        }
        ChannelError::Closed(CloseCause::Eof) => CloseReason::StreamEnded,
        ChannelError::Transport(e) => CloseReason::TransportError(e.to_string()),
    }
}

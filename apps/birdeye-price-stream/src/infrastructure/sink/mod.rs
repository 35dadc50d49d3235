//! Tracing Event Sink
//!
//! Production output collaborator: writes one log line per session event.

use crate::application::ports::{EventSink, RejectReason, SessionEvent};
use crate::domain::market::OrUnknown;

/// `EventSink` that logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl TracingEventSink {
    /// Create a new sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: SessionEvent) {
        match event {
            SessionEvent::Welcome => {
                tracing::info!("Welcome message received");
            }
            SessionEvent::PriceUpdate(update) => {
                let time = update.instant_rfc3339();
                tracing::info!(
                    open = %OrUnknown(update.open.as_ref()),
                    high = %OrUnknown(update.high.as_ref()),
                    low = %OrUnknown(update.low.as_ref()),
                    close = %OrUnknown(update.close.as_ref()),
                    volume = %OrUnknown(update.volume.as_ref()),
                    symbol = %OrUnknown(update.symbol.as_ref()),
                    time = %OrUnknown(time.as_ref()),
                    "Price update received"
                );
            }
            SessionEvent::Unhandled { message_type } => {
                tracing::info!(message_type = %message_type, "Unhandled message type");
            }
            SessionEvent::FrameRejected(RejectReason::MissingType) => {
                tracing::warn!("Message type not found");
            }
            SessionEvent::FrameRejected(RejectReason::Malformed(error)) => {
                tracing::warn!(error = %error, "Error parsing message");
            }
            SessionEvent::FrameRejected(RejectReason::InvalidPayload {
                message_type,
                detail,
            }) => {
                tracing::warn!(
                    message_type = %message_type,
                    detail = %detail,
                    "Malformed price payload"
                );
            }
        }
    }
}

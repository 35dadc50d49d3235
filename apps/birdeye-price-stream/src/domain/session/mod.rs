//! Session Lifecycle Types
//!
//! The session moves through a linear state machine:
//!
//! ```text
//! Connecting ──► Subscribing ──► Streaming ──► Closed
//!      │              │                          ▲
//!      └──────────────┴──────── fatal ───────────┘
//! ```
//!
//! `Closed` is terminal. There is no reconnect state: a closed session
//! ends the process.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

// =============================================================================
// State Machine
// =============================================================================

/// Lifecycle state of a price stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Handshake in progress.
    #[default]
    Connecting,
    /// Handshake done, subscription request not yet sent.
    Subscribing,
    /// Subscription sent, receiving frames.
    Streaming,
    /// Session ended.
    Closed,
}

/// Event that drives a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// Handshake completed.
    HandshakeSucceeded,
    /// Subscription request fully sent.
    SubscriptionSent,
    /// Receive loop observed close or error, or the watchdog fired.
    Terminated,
    /// Handshake or subscription send failed.
    Failed,
}

/// Rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid session transition {transition:?} from {from}")]
pub struct InvalidTransition {
    /// State the transition was attempted from.
    pub from: SessionState,
    /// Rejected transition.
    pub transition: SessionTransition,
}

impl SessionState {
    /// Apply a transition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for any edge outside the state machine,
    /// including every transition out of `Closed`.
    pub const fn transition(self, transition: SessionTransition) -> Result<Self, InvalidTransition> {
        match (self, transition) {
            (Self::Connecting, SessionTransition::HandshakeSucceeded) => Ok(Self::Subscribing),
            (Self::Subscribing, SessionTransition::SubscriptionSent) => Ok(Self::Streaming),
            (Self::Streaming, SessionTransition::Terminated)
            | (Self::Connecting | Self::Subscribing, SessionTransition::Failed) => Ok(Self::Closed),
            (from, transition) => Err(InvalidTransition { from, transition }),
        }
    }

    /// Get the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Subscribing => "subscribing",
            Self::Streaming => "streaming",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Close Reason
// =============================================================================

/// Why a streaming session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The session watchdog closed the connection.
    WatchdogExpired,
    /// The connection was closed locally on request (e.g. Ctrl+C).
    Shutdown,
    /// The server sent a close frame.
    RemoteClosed {
        /// Close code, if the frame carried one.
        code: Option<u16>,
        /// Close reason text (may be empty).
        reason: String,
    },
    /// The stream ended without a close frame.
    StreamEnded,
    /// Transport-level failure while receiving.
    TransportError(String),
}

impl CloseReason {
    /// Check whether this is an expected, graceful ending.
    #[must_use]
    pub const fn is_graceful(&self) -> bool {
        matches!(
            self,
            Self::WatchdogExpired | Self::Shutdown | Self::RemoteClosed { .. }
        )
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WatchdogExpired => f.write_str("session duration elapsed"),
            Self::Shutdown => f.write_str("shutdown requested"),
            Self::RemoteClosed { code: Some(code), reason } if !reason.is_empty() => {
                write!(f, "closed by server ({code}): {reason}")
            }
            Self::RemoteClosed { code: Some(code), .. } => write!(f, "closed by server ({code})"),
            Self::RemoteClosed { code: None, .. } => f.write_str("closed by server"),
            Self::StreamEnded => f.write_str("stream ended"),
            Self::TransportError(e) => write!(f, "transport error: {e}"),
        }
    }
}

// =============================================================================
// Session Summary
// =============================================================================

/// Counters collected over one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Frames received from the server.
    pub frames_received: u64,
    /// `PRICE_DATA` messages dispatched.
    pub price_updates: u64,
    /// `WELCOME` messages dispatched.
    pub welcomes: u64,
    /// Messages of a type this client does not handle.
    pub unhandled: u64,
    /// Frames that failed to decode and were skipped.
    pub rejected: u64,
    /// Time between subscription and close.
    pub elapsed: Duration,
    /// Why the session ended.
    pub close_reason: CloseReason,
    /// Lifecycle state the session finished in.
    pub state: SessionState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let state = SessionState::default();
        assert_eq!(state, SessionState::Connecting);

        let state = state
            .transition(SessionTransition::HandshakeSucceeded)
            .unwrap();
        assert_eq!(state, SessionState::Subscribing);

        let state = state.transition(SessionTransition::SubscriptionSent).unwrap();
        assert_eq!(state, SessionState::Streaming);

        let state = state.transition(SessionTransition::Terminated).unwrap();
        assert_eq!(state, SessionState::Closed);
    }

    #[test]
    fn failures_go_straight_to_closed() {
        assert_eq!(
            SessionState::Connecting.transition(SessionTransition::Failed),
            Ok(SessionState::Closed)
        );
        assert_eq!(
            SessionState::Subscribing.transition(SessionTransition::Failed),
            Ok(SessionState::Closed)
        );
    }

    #[test]
    fn closed_is_terminal() {
        for transition in [
            SessionTransition::HandshakeSucceeded,
            SessionTransition::SubscriptionSent,
            SessionTransition::Terminated,
            SessionTransition::Failed,
        ] {
            let err = SessionState::Closed.transition(transition).unwrap_err();
            assert_eq!(err.from, SessionState::Closed);
        }
    }

    #[test]
    fn cannot_stream_before_subscribing() {
        assert!(
            SessionState::Connecting
                .transition(SessionTransition::SubscriptionSent)
                .is_err()
        );
        assert!(
            SessionState::Subscribing
                .transition(SessionTransition::Terminated)
                .is_err()
        );
    }

    #[test]
    fn close_reason_display() {
        assert_eq!(
            CloseReason::WatchdogExpired.to_string(),
            "session duration elapsed"
        );
        assert_eq!(
            CloseReason::RemoteClosed {
                code: Some(1000),
                reason: "bye".to_string()
            }
            .to_string(),
            "closed by server (1000): bye"
        );
        assert!(CloseReason::WatchdogExpired.is_graceful());
        assert!(!CloseReason::TransportError("reset".to_string()).is_graceful());
    }
}

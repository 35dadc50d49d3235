//! Birdeye WebSocket Adapters
//!
//! Implements the price stream client for Birdeye's public socket API:
//!
//! - **Connector**: Connection target, handshake headers, single handshake
//! - **Session**: Subscription, watchdog, receive and dispatch loop
//! - **Codec**: JSON decoding of `type`-tagged inbound messages

pub mod codec;
pub mod connector;
pub mod messages;
pub mod session;
pub mod watchdog;

pub use codec::{CodecError, JsonCodec};
pub use connector::{
    ApiKey, ConnectionError, ConnectionTarget, Connector, HandshakeMetadata, Scheme,
    WebSocketChannel,
};
pub use messages::{InboundMessage, PriceSubscription, SubscriptionRequest};
pub use session::{Session, SessionError, classify_frame};
pub use watchdog::{DEFAULT_SESSION_DURATION, Watchdog, WatchdogOutcome};

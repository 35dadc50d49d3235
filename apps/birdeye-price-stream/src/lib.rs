#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Birdeye Price Stream - Token Price Client
//!
//! Opens one WebSocket session to Birdeye's public socket API, subscribes to
//! a single token's price feed and logs every update until the server closes
//! the connection, the transport fails, or the session duration elapses.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Price updates and the session lifecycle
//!   - `market`: Decoded price events
//!   - `session`: Session state machine, close reasons, summary
//!
//! - **Application**: Port definitions
//!   - `ports`: Message channel, close signal, event sink
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `birdeye`: Connector, codec, watchdog and session loop
//!   - `config`: Command-line and environment configuration
//!   - `sink`: Log-line output of session events
//!   - `metrics`, `telemetry`: Observability
//!
//! # Data Flow
//!
//! ```text
//!              ┌───────────┐  frames  ┌─────────┐  events  ┌───────────┐
//! Birdeye WS ─►│ WebSocket │─────────►│ Session │─────────►│ EventSink │─► logs
//!              │  Channel  │◄─────────│  loop   │          └───────────┘
//!              └───────────┘ subscribe└─────────┘
//!                    ▲                     │
//!                    └──── close ──── Watchdog
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Price and session types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::market::{Amount, PriceUpdate};
pub use domain::session::{CloseReason, SessionState, SessionSummary};

// Ports
pub use application::ports::{
    ChannelCloser, ChannelError, EventSink, Frame, MessageChannel, SessionEvent,
};

// Birdeye client
pub use infrastructure::birdeye::{
    ConnectionError, ConnectionTarget, Connector, HandshakeMetadata, Session, SessionError,
    SubscriptionRequest,
};

// Configuration
pub use infrastructure::config::{Cli, ClientConfig, ConfigError};

// Output
pub use infrastructure::sink::TracingEventSink;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};

//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Birdeye WebSocket adapters (connector, codec, session loop).
pub mod birdeye;

/// Command-line and environment configuration.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Log-line output for session events.
pub mod sink;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;

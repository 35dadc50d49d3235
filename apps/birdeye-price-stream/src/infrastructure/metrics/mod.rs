//! Prometheus Metrics Module
//!
//! Exposes session metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Frames**: Counts of frames received, rejected and dispatched by type
//! - **Connection**: Whether the price stream is currently connected
//! - **Session**: Session duration
//!
//! # Integration
//!
//! When a metrics port is configured, metrics are served at `/metrics` on
//! that port. Without one no recorder is installed and recording is a no-op.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// =============================================================================
// Exporter
// =============================================================================

static METRICS_ADDR: OnceLock<SocketAddr> = OnceLock::new();

/// Install the Prometheus exporter with a scrape listener on `port`.
///
/// Must be called from within a Tokio runtime. Calling it again after a
/// successful install is a no-op that returns the first address.
///
/// # Errors
///
/// Returns an error if the recorder or the HTTP listener cannot be installed.
pub fn init_metrics(port: u16) -> Result<SocketAddr, BuildError> {
    if let Some(addr) = METRICS_ADDR.get() {
        return Ok(*addr);
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();

    Ok(*METRICS_ADDR.get_or_init(|| addr))
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "price_stream_frames_received_total",
        "Total frames received from the price socket"
    );
    describe_counter!(
        "price_stream_frames_rejected_total",
        "Total frames skipped because they could not be decoded"
    );
    describe_counter!(
        "price_stream_price_updates_total",
        "Total PRICE_DATA messages dispatched"
    );
    describe_counter!(
        "price_stream_unhandled_messages_total",
        "Total messages of an unhandled type"
    );
    describe_gauge!(
        "price_stream_connected",
        "1 while the price stream session is streaming"
    );
    describe_histogram!(
        "price_stream_session_duration_seconds",
        "Time from subscription to session close"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a frame received from the socket.
pub fn record_frame_received() {
    counter!("price_stream_frames_received_total").increment(1);
}

/// Record a frame skipped during decoding.
pub fn record_frame_rejected(reason: &'static str) {
    counter!("price_stream_frames_rejected_total", "reason" => reason).increment(1);
}

/// Record a dispatched price update.
pub fn record_price_update() {
    counter!("price_stream_price_updates_total").increment(1);
}

/// Record a message of an unhandled type.
pub fn record_unhandled_message(message_type: &str) {
    counter!(
        "price_stream_unhandled_messages_total",
        "message_type" => message_type.to_string()
    )
    .increment(1);
}

/// Set whether the session is streaming.
pub fn set_connected(connected: bool) {
    gauge!("price_stream_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Record the duration of a finished session.
pub fn record_session_duration(duration: Duration) {
    histogram!("price_stream_session_duration_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================

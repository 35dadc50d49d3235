//! Birdeye Price Stream Binary
//!
//! Streams one token's price updates from Birdeye and logs them.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin birdeye-price-stream -- [CHAIN] [ADDRESS]
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `BIRDEYE_API_KEY`: Birdeye API key
//!
//! ## Optional
//! - `BIRDEYE_WS_HOST`: Socket host (default: public-api.birdeye.so)
//! - `BIRDEYE_SESSION_SECS`: Session duration in seconds (default: 3600)
//! - `BIRDEYE_METRICS_PORT`: Prometheus metrics port (default: 0, disabled)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: birdeye-price-stream)
//! - `RUST_LOG`: Log level (default: info)

use std::process::ExitCode;

use birdeye_price_stream::application::ports::ChannelCloser;
use birdeye_price_stream::infrastructure::telemetry;
use birdeye_price_stream::{
    ClientConfig, Connector, Session, SessionSummary, TracingEventSink, init_metrics,
};
use tokio::signal;

#[tokio::main]
async fn main() -> ExitCode {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("Failed to install rustls crypto provider");
        return ExitCode::FAILURE;
    }

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    match run().await {
        Ok(summary) => {
            log_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let error = format!("{e:#}");
            tracing::error!(error = %error, "Price stream failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<SessionSummary> {
    let config = ClientConfig::load()?;
    log_config(&config);

    if let Some(port) = config.metrics_port {
        let addr = init_metrics(port)?;
        tracing::info!(addr = %addr, "Metrics endpoint listening");
    }

    let connector = Connector::new(config.target.clone(), config.handshake_metadata());
    let channel = connector.connect().await?;

    let session = Session::new(channel, TracingEventSink::new(), config.session_duration)?;
    let shutdown = tokio::spawn(await_shutdown(session.closer()));

    let result = session.run(&config.subscription()).await;
    shutdown.abort();

    Ok(result?)
}

/// Log the parsed configuration.
fn log_config(config: &ClientConfig) {
    tracing::info!(
        chain = config.target.chain(),
        address = %config.address,
        session_secs = config.session_duration.as_secs(),
        metrics_port = config.metrics_port.unwrap_or_default(),
        "Configuration loaded"
    );
}

/// Log the end-of-session counters.
fn log_summary(summary: &SessionSummary) {
    tracing::info!(
        frames_received = summary.frames_received,
        price_updates = summary.price_updates,
        welcomes = summary.welcomes,
        unhandled = summary.unhandled,
        rejected = summary.rejected,
        elapsed_secs = summary.elapsed.as_secs(),
        state = %summary.state,
        reason = %summary.close_reason,
        "Session finished"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Close the session on SIGTERM or SIGINT.
async fn await_shutdown(closer: ChannelCloser) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, closing connection");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, closing connection");
        }
    }

    closer.close();
}

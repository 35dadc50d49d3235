//! Client Configuration Settings
//!
//! Command-line and environment configuration for the price stream client.

use std::time::Duration;

use clap::Parser;

use crate::infrastructure::birdeye::connector::DEFAULT_HOST;
use crate::infrastructure::birdeye::{
    ApiKey, ConnectionError, ConnectionTarget, DEFAULT_SESSION_DURATION, HandshakeMetadata,
    Scheme, SubscriptionRequest,
};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "BIRDEYE_API_KEY";

/// Chain used when none is given.
pub const DEFAULT_CHAIN: &str = "solana";

/// Token address used when none is given (wrapped SOL).
pub const DEFAULT_ADDRESS: &str = "So11111111111111111111111111111111111111112";

/// Command-line interface.
#[derive(Debug, Clone, Parser)]
#[command(name = "birdeye-price-stream", version, about = "Stream Birdeye token prices")]
pub struct Cli {
    /// Chain identifier (e.g. solana, ethereum).
    #[arg(default_value = DEFAULT_CHAIN)]
    pub chain: String,

    /// Token address to subscribe to.
    #[arg(default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Birdeye API key.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Socket host.
    #[arg(long, env = "BIRDEYE_WS_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Connect with plain `ws` instead of `wss`.
    #[arg(long)]
    pub insecure: bool,

    /// Seconds before the session is closed automatically.
    #[arg(long, env = "BIRDEYE_SESSION_SECS", default_value_t = DEFAULT_SESSION_DURATION.as_secs())]
    pub session_secs: u64,

    /// Prometheus scrape port (0 = disabled).
    #[arg(long, env = "BIRDEYE_METRICS_PORT", default_value_t = 0)]
    pub metrics_port: u16,
}

/// Validated client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection target, credential included.
    pub target: ConnectionTarget,
    /// Token address to subscribe to.
    pub address: String,
    /// Session duration before the watchdog closes the connection.
    pub session_duration: Duration,
    /// Prometheus scrape port, if enabled.
    pub metrics_port: Option<u16>,
}

impl ClientConfig {
    /// Parse the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required value is missing or invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::try_from(Cli::parse())
    }

    /// Handshake headers for the configured host.
    #[must_use]
    pub fn handshake_metadata(&self) -> HandshakeMetadata {
        HandshakeMetadata::for_host(self.target.host())
    }

    /// The price subscription for the configured address.
    #[must_use]
    pub fn subscription(&self) -> SubscriptionRequest {
        SubscriptionRequest::price(self.address.clone())
    }
}

impl TryFrom<Cli> for ClientConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let api_key = cli
            .api_key
            .ok_or_else(|| ConfigError::MissingEnvVar(API_KEY_ENV.to_string()))?;
        let api_key =
            ApiKey::new(api_key).map_err(|_| ConfigError::EmptyValue(API_KEY_ENV.to_string()))?;

        if cli.chain.trim().is_empty() {
            return Err(ConfigError::EmptyValue("chain".to_string()));
        }
        if cli.address.trim().is_empty() {
            return Err(ConfigError::EmptyValue("address".to_string()));
        }
        if cli.session_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "session-secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let scheme = if cli.insecure { Scheme::Ws } else { Scheme::Wss };
        let target = ConnectionTarget::new(scheme, cli.host, cli.chain, api_key)?;

        Ok(Self {
            target,
            address: cli.address,
            session_duration: Duration::from_secs(cli.session_secs),
            metrics_port: (cli.metrics_port != 0).then_some(cli.metrics_port),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Value is empty.
    #[error("{0} cannot be empty")]
    EmptyValue(String),
    /// Value is present but unusable.
    #[error("invalid {name}: {reason}")]
    InvalidValue {
        /// Setting name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<ConnectionError> for ConfigError {
    fn from(err: ConnectionError) -> Self {
        Self::InvalidValue {
            name: "connection target".to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::birdeye::connector::SUB_PROTOCOL;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["birdeye-price-stream"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_with_key() {
        let config = ClientConfig::try_from(cli(&["--api-key", "k123"])).unwrap();
        assert_eq!(config.target.chain(), DEFAULT_CHAIN);
        assert_eq!(config.target.host(), DEFAULT_HOST);
        assert_eq!(config.target.scheme(), Scheme::Wss);
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.session_duration, Duration::from_secs(3600));
        assert_eq!(config.metrics_port, None);
        assert_eq!(
            config.target.url(),
            "wss://public-api.birdeye.so/socket/solana?x-api-key=k123"
        );
    }

    #[test]
    fn positional_chain_and_address() {
        let config =
            ClientConfig::try_from(cli(&["ethereum", "0xabc", "--api-key", "k"])).unwrap();
        assert_eq!(config.target.chain(), "ethereum");
        assert_eq!(config.address, "0xabc");
        assert_eq!(config.subscription().address(), "0xabc");
    }

    #[test]
    fn insecure_host_and_ports() {
        let config = ClientConfig::try_from(cli(&[
            "--api-key",
            "k",
            "--host",
            "127.0.0.1:9001",
            "--insecure",
            "--session-secs",
            "5",
            "--metrics-port",
            "9100",
        ]))
        .unwrap();
        assert_eq!(config.target.url(), "ws://127.0.0.1:9001/socket/solana?x-api-key=k");
        assert_eq!(config.session_duration, Duration::from_secs(5));
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn handshake_headers_follow_host() {
        let config = ClientConfig::try_from(cli(&["--api-key", "k"])).unwrap();
        let metadata = config.handshake_metadata();
        assert_eq!(metadata.get("origin"), Some("ws://public-api.birdeye.so"));
        assert_eq!(
            metadata.get("Sec-WebSocket-Origin"),
            Some("ws://public-api.birdeye.so")
        );
        assert_eq!(metadata.get("Sec-WebSocket-Protocol"), Some(SUB_PROTOCOL));
    }

    #[test]
    fn blank_key_is_empty_value() {
        let err = ClientConfig::try_from(cli(&["--api-key", "  "])).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(name) if name == API_KEY_ENV));
    }

    #[test]
    fn missing_key_is_reported() {
        let mut parsed = cli(&[]);
        parsed.api_key = None;
        let err = ClientConfig::try_from(parsed).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(name) if name == API_KEY_ENV));
    }

    #[test]
    fn zero_session_is_rejected() {
        let err =
            ClientConfig::try_from(cli(&["--api-key", "k", "--session-secs", "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn empty_chain_is_rejected() {
        let err = ClientConfig::try_from(cli(&["", "--api-key", "k"])).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(name) if name == "chain"));
    }

    #[test]
    fn debug_redacts_key() {
        let config = ClientConfig::try_from(cli(&["--api-key", "secret-key"])).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }
}

//! Configuration Module
//!
//! Command-line and environment configuration for the price stream client.

mod settings;

pub use settings::{
    API_KEY_ENV, Cli, ClientConfig, ConfigError, DEFAULT_ADDRESS, DEFAULT_CHAIN,
};

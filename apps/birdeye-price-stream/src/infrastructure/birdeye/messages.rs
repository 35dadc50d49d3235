//! Birdeye WebSocket Message Types
//!
//! Wire format types for the Birdeye public socket API.
//!
//! # Outbound
//!
//! - `SUBSCRIBE_PRICE`: Subscribe to one token's price candles
//!
//! # Inbound
//!
//! All inbound messages are JSON objects with a top-level `type`
//! discriminator and a `data` payload whose shape depends on `type`:
//!
//! - `WELCOME`: Session established, no payload
//! - `PRICE_DATA`: OHLCV candle update
//! - anything else: surfaced as `Unknown` with the raw type
//!
//! # References
//!
//! - [WebSocket Price](https://docs.birdeye.so/docs/websocket)

use serde::{Deserialize, Serialize};

use crate::domain::market::PriceUpdate;

// =============================================================================
// Constants
// =============================================================================

/// Message type of the price subscription request.
pub const SUBSCRIBE_PRICE: &str = "SUBSCRIBE_PRICE";

/// Inbound message type for the server welcome.
pub const WELCOME: &str = "WELCOME";

/// Inbound message type for a price update.
pub const PRICE_DATA: &str = "PRICE_DATA";

/// Query type used for single-token subscriptions.
pub const QUERY_TYPE_SIMPLE: &str = "simple";

/// Candle interval requested from the server.
pub const CHART_TYPE_1M: &str = "1m";

/// Quote currency for prices.
pub const CURRENCY_USD: &str = "usd";

// =============================================================================
// Outbound Messages
// =============================================================================

/// Price subscription request.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "SUBSCRIBE_PRICE",
///   "data": {
///     "queryType": "simple",
///     "chartType": "1m",
///     "address": "So11111111111111111111111111111111111111112",
///     "currency": "usd"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// Message type (always `SUBSCRIBE_PRICE`)
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Subscription parameters
    pub data: PriceSubscription,
}

/// Parameters of a price subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSubscription {
    /// Query type (always "simple")
    pub query_type: String,

    /// Candle interval (always "1m")
    pub chart_type: String,

    /// Token address
    pub address: String,

    /// Quote currency (always "usd")
    pub currency: String,
}

impl SubscriptionRequest {
    /// Create a price subscription for one token address.
    ///
    /// Every field except `address` is fixed.
    #[must_use]
    pub fn price(address: impl Into<String>) -> Self {
        Self {
            msg_type: SUBSCRIBE_PRICE.to_string(),
            data: PriceSubscription {
                query_type: QUERY_TYPE_SIMPLE.to_string(),
                chart_type: CHART_TYPE_1M.to_string(),
                address: address.into(),
                currency: CURRENCY_USD.to_string(),
            },
        }
    }

    /// Subscribed token address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.data.address
    }
}

// =============================================================================
// Inbound Messages
// =============================================================================

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Server welcome, no payload.
    Welcome,
    /// Price candle update.
    PriceData(PriceUpdate),
    /// Message type this client does not handle.
    Unknown(String),
}

//! Market Data Types
//!
//! Codec-agnostic representation of a token price update. Every field is
//! optional: the feed is tolerated field by field, so a record with a
//! missing or malformed field still reaches the output with that field
//! reported as `unknown`.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

/// Placeholder printed for a field the feed did not provide.
pub const UNKNOWN: &str = "unknown";

// =============================================================================
// Amount
// =============================================================================

/// A numeric field as reported by the feed.
///
/// Values that fit a `Decimal` without rounding are kept exact. Anything
/// else (more than 28 fractional digits, or beyond `Decimal` range) keeps
/// the feed's own number text, so nothing is reported as zero or dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Amount {
    /// Exactly representable value.
    Exact(Decimal),
    /// Number text outside `Decimal` precision or range.
    Raw(String),
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(d) => d.fmt(f),
            Self::Raw(text) => f.write_str(text),
        }
    }
}

// =============================================================================
// Price Update
// =============================================================================

/// One OHLCV price update for a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceUpdate {
    /// Open price of the candle.
    pub open: Option<Amount>,
    /// High price of the candle.
    pub high: Option<Amount>,
    /// Low price of the candle.
    pub low: Option<Amount>,
    /// Close price of the candle.
    pub close: Option<Amount>,
    /// Traded volume.
    pub volume: Option<Amount>,
    /// Token symbol (e.g., "SOL").
    pub symbol: Option<String>,
    /// Candle instant, converted from epoch milliseconds.
    pub timestamp: Option<DateTime<Utc>>,
}

impl PriceUpdate {
    /// Candle instant as RFC 3339 UTC with second precision.
    #[must_use]
    pub fn instant_rfc3339(&self) -> Option<String> {
        self.timestamp
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

// =============================================================================
// Display Helper
// =============================================================================

/// Displays the wrapped value, or `unknown` when absent.
#[derive(Debug, Clone, Copy)]
pub struct OrUnknown<'a, T>(pub Option<&'a T>);

impl<T: fmt::Display> fmt::Display for OrUnknown<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str(UNKNOWN),
        }
    }
}

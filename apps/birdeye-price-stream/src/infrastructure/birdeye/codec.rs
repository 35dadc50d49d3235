//! Stream Codec Module
//!
//! JSON encoding and decoding for the Birdeye price socket.
//!
//! Decoding classifies a frame by its `type` field before touching the
//! payload. `PRICE_DATA` payloads are read field by field: a missing or
//! malformed field becomes `None` instead of failing the whole record.
//!
//! Example `PRICE_DATA` frame:
//! ```json
//! {"type":"PRICE_DATA","data":{"o":1,"h":2,"l":0.5,"c":1.5,"v":100,"symbol":"SOL","unixTime":1700000000000}}
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::application::ports::RejectReason;
use crate::domain::market::{Amount, PriceUpdate};
use crate::infrastructure::birdeye::messages::{InboundMessage, PRICE_DATA, WELCOME};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that is not an object.
    #[error("expected JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The `type` field is absent or not a string.
    #[error("message type not found")]
    MissingType,

    /// Known message type with an unusable payload.
    #[error("invalid {message_type} payload: {detail}")]
    InvalidPayload {
        /// Message type of the frame.
        message_type: String,
        /// What was wrong with it.
        detail: String,
    },
}

impl From<CodecError> for RejectReason {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Json(e) => Self::Malformed(e.to_string()),
            CodecError::NotAnObject(kind) => {
                Self::Malformed(format!("expected JSON object, got {kind}"))
            }
            CodecError::MissingType => Self::MissingType,
            CodecError::InvalidPayload {
                message_type,
                detail,
            } => Self::InvalidPayload {
                message_type,
                detail,
            },
        }
    }
}

/// JSON codec for the price socket.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one frame payload into an `InboundMessage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a JSON object, has no string
    /// `type` field, or is a `PRICE_DATA` message whose `data` is not an
    /// object.
    pub fn decode(&self, payload: &[u8]) -> Result<InboundMessage, CodecError> {
        let value: Value = serde_json::from_slice(payload)?;

        let mut object = match value {
            Value::Object(object) => object,
            other => return Err(CodecError::NotAnObject(json_kind(&other))),
        };

        let msg_type = match object.get("type") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(CodecError::MissingType),
        };

        match msg_type.as_str() {
            WELCOME => Ok(InboundMessage::Welcome),
            PRICE_DATA => match object.remove("data") {
                Some(Value::Object(data)) => Ok(InboundMessage::PriceData(price_update(&data))),
                Some(other) => Err(CodecError::InvalidPayload {
                    message_type: msg_type,
                    detail: format!("expected object for data, got {}", json_kind(&other)),
                }),
                None => Err(CodecError::InvalidPayload {
                    message_type: msg_type,
                    detail: "missing data".to_string(),
                }),
            },
            _ => Ok(InboundMessage::Unknown(msg_type)),
        }
    }

    /// Encode a value to JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

// =============================================================================
// Field Extraction
// =============================================================================

fn price_update(data: &Map<String, Value>) -> PriceUpdate {
    PriceUpdate {
        open: amount_field(data, "o"),
        high: amount_field(data, "h"),
        low: amount_field(data, "l"),
        close: amount_field(data, "c"),
        volume: amount_field(data, "v"),
        symbol: data
            .get("symbol")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        timestamp: epoch_millis_field(data, "unixTime"),
    }
}

/// Read a numeric field, accepting JSON numbers and numeric strings.
///
/// Values a `Decimal` holds exactly become [`Amount::Exact`]. Finite values
/// outside its range or scale keep their JSON text as [`Amount::Raw`].
fn amount_field(data: &Map<String, Value>, key: &str) -> Option<Amount> {
    match data.get(key)? {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Amount::Exact(Decimal::from(i)))
            } else if let Some(u) = n.as_u64() {
                Some(Amount::Exact(Decimal::from(u)))
            } else {
                let f = n.as_f64().filter(|f| f.is_finite())?;
                // f64 Display never uses exponent notation.
                Some(
                    Decimal::from_str_exact(&f.to_string())
                        .map_or_else(|_| Amount::Raw(n.to_string()), Amount::Exact),
                )
            }
        }
        Value::String(s) => {
            let s = s.trim();
            match Decimal::from_str_exact(s) {
                Ok(d) => Some(Amount::Exact(d)),
                Err(_) => s
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|_| Amount::Raw(s.to_string())),
            }
        }
        _ => None,
    }
}

/// Read epoch milliseconds (integer or float) as a UTC instant.
fn epoch_millis_field(data: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let Value::Number(n) = data.get(key)? else {
        return None;
    };
    #[allow(clippy::cast_possible_truncation)]
    let millis = n
        .as_i64()
        .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
    DateTime::from_timestamp_millis(millis)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

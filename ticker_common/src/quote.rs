//! Quote data model and the JSON payloads exchanged over HTTP.
//!
//! A `Quote` is one normalized price record. `DataResponse`, `RefreshSettings` and
//! `ErrorResponse` are the bodies of the server's API replies; field names are camelCase on
//! the wire.
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Market quote for a single ticker symbol.
///
/// `change` and `change_percent` are either both present or both absent; build quotes through
/// [`Quote::new`] to keep that pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Uppercase symbol identifier.
    pub symbol: String,
    /// Last traded price, if the provider reported one.
    pub price: Option<f64>,
    /// ISO currency code of the price.
    pub currency: String,
    /// Absolute change against the previous close.
    pub change: Option<f64>,
    /// Relative change against the previous close, in percent.
    pub change_percent: Option<f64>,
    /// Observation time in milliseconds since the Unix epoch.
    pub timestamp: Option<u64>,
}

impl Quote {
    /// Build a quote, deriving `change`/`change_percent` from `price` and `previous_close`.
    ///
    /// Both derived fields stay `None` unless a price and a non-zero previous close are known.
    pub fn new(
        symbol: &str,
        price: Option<f64>,
        previous_close: Option<f64>,
        currency: &str,
        timestamp: Option<u64>,
    ) -> Self {
        let (change, change_percent) = match (price, previous_close) {
            (Some(price), Some(prev)) if prev != 0.0 && prev.is_finite() && price.is_finite() => {
                let change = price - prev;
                (Some(change), Some(change / prev * 100.0))
            }
            _ => (None, None),
        };

        Quote {
            symbol: symbol.trim().to_uppercase(),
            price,
            currency: currency.to_string(),
            change,
            change_percent,
            timestamp,
        }
    }
}

/// Body of `GET /api/data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    /// Time of the last successful refresh in epoch milliseconds (0 = never).
    pub updated_at: u64,
    /// Quotes in configured symbol order.
    pub quotes: Vec<Quote>,
    /// Server refresh cadence in milliseconds.
    pub refresh_ms: u64,
}

/// Body of a successful `POST /api/settings/refresh`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSettings {
    /// New cadence in milliseconds.
    pub refresh_ms: u64,
    /// New cadence in minutes.
    pub refresh_minutes: f64,
}

/// Error body returned with 4xx/5xx statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human readable error text.
    pub error: String,
}

impl ErrorResponse {
    /// Wrap any displayable error.
    pub fn new(error: impl ToString) -> Self {
        ErrorResponse {
            error: error.to_string(),
        }
    }
}

/// Current UTC time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

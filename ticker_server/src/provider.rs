//! Upstream quote provider.
//!
//! `QuoteFetcher` is the boundary the cache talks to: given one symbol it returns a
//! normalized [`Quote`] or a typed [`QuoteError`]. `YahooFetcher` implements it on top of the
//! Yahoo Finance chart endpoint.
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use ticker_common::{Quote, QuoteError, Symbol};

/// Base URL of the public chart API.
pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
/// Some providers refuse requests without a browser-like agent.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; TickerServer/1.0)";
/// Per-request timeout used when none is configured.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of quotes for individual symbols.
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    /// Fetch the current quote for `symbol`.
    async fn fetch(&self, symbol: &Symbol) -> Result<Quote, QuoteError>;
}

/// Fetches quotes from the Yahoo Finance chart API.
#[derive(Debug, Clone)]
pub struct YahooFetcher {
    client: Client,
    base_url: String,
}

impl YahooFetcher {
    /// Create a fetcher against `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, QuoteError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| QuoteError::Transport(e.to_string()))?;
        Ok(YahooFetcher {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, symbol: &Symbol) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }
}

#[async_trait]
impl QuoteFetcher for YahooFetcher {
    async fn fetch(&self, symbol: &Symbol) -> Result<Quote, QuoteError> {
        let url = self.chart_url(symbol);
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("range", "5d"), ("interval", "1d"), ("includePrePost", "false")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QuoteError::Transport(format!("request for '{}' timed out", symbol))
                } else {
                    QuoteError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| QuoteError::Transport(e.to_string()))?;

        if !status.is_success() {
            // Yahoo reports unknown symbols as 404 with an error payload; prefer its message.
            if let Ok(payload) = serde_json::from_slice::<ChartPayload>(&body) {
                if let Some(err) = payload.chart.error {
                    return Err(err.into_quote_error(symbol));
                }
            }
            return Err(QuoteError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let payload: ChartPayload = serde_json::from_slice(&body)?;
        payload.into_quote(symbol)
    }
}

#[derive(Debug, Deserialize)]
struct ChartPayload {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

impl ChartError {
    fn into_quote_error(self, symbol: &Symbol) -> QuoteError {
        let message = self
            .description
            .or(self.code)
            .unwrap_or_else(|| "unknown error".to_string());
        QuoteError::Provider {
            symbol: symbol.to_string(),
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    currency: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<IndicatorQuote>,
}

#[derive(Debug, Deserialize)]
struct IndicatorQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartPayload {
    fn into_quote(self, requested: &Symbol) -> Result<Quote, QuoteError> {
        if let Some(err) = self.chart.error {
            return Err(err.into_quote_error(requested));
        }

        let result = self
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| QuoteError::EmptyResult(requested.to_string()))?;

        let meta = result.meta;
        let last_close = result
            .indicators
            .and_then(|ind| ind.quote.into_iter().next())
            .and_then(|q| q.close.into_iter().flatten().last());

        let price = meta.regular_market_price.or(last_close);
        let previous_close = meta.chart_previous_close.or(meta.previous_close);
        let symbol = meta.symbol.unwrap_or_else(|| requested.to_string());
        let currency = meta.currency.unwrap_or_else(|| "USD".to_string());
        let timestamp = meta
            .regular_market_time
            .filter(|secs| *secs > 0)
            .map(|secs| secs as u64 * 1000);

        Ok(Quote::new(&symbol, price, previous_close, &currency, timestamp))
    }
}

//! HTTP API.
//!
//! - `GET /api/data[?symbols=A,B]` — cached snapshot, or an uncached fetch for explicit symbols.
//! - `POST /api/settings/refresh` — change the refresh cadence (`minutes` in a JSON body or the
//!   query string).
//!
//! Validation failures answer 400, provider failures 502; both carry `{ "error": "..." }`.
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use serde::Deserialize;
use ticker_common::net::{DATA_PATH, REFRESH_SETTINGS_PATH};
use ticker_common::quote::now_millis;
use ticker_common::symbols::parse_symbol_list;
use ticker_common::{DataResponse, ErrorResponse, QuoteError, RefreshCadence, RefreshSettings};

use crate::model::cache::QuoteCache;
use crate::model::scheduler::RefreshScheduler;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Shared quote cache.
    pub cache: QuoteCache,
    /// Refresh timer and cadence owner.
    pub scheduler: Arc<RefreshScheduler>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(DATA_PATH, get(data_handler))
        .route(REFRESH_SETTINGS_PATH, post(refresh_settings_handler))
        .with_state(state)
}

/// Error reply carrying an HTTP status and a message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        let status = match err {
            QuoteError::Validation(_) | QuoteError::InvalidSymbol(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct DataParams {
    symbols: Option<String>,
}

/// GET /api/data
async fn data_handler(
    State(state): State<AppState>,
    Query(params): Query<DataParams>,
) -> Result<Json<DataResponse>, ApiError> {
    let refresh_ms = state.scheduler.cadence().as_millis();

    if let Some(raw) = params.symbols.as_deref().filter(|s| !s.trim().is_empty()) {
        let symbols = parse_symbol_list(raw)?;
        let quotes = state.cache.refresh_for(&symbols).await.map_err(|e| {
            warn!("Ad-hoc fetch for {} failed: {}", raw, e);
            e
        })?;
        return Ok(Json(DataResponse {
            updated_at: now_millis(),
            quotes,
            refresh_ms,
        }));
    }

    let mut snapshot = state.cache.snapshot();
    if !snapshot.is_populated() {
        snapshot = match state.cache.refresh(true).await {
            Ok(outcome) => outcome.snapshot().clone(),
            Err(e) => {
                // Another refresh may have landed meanwhile; only fail when still empty.
                let latest = state.cache.snapshot();
                if !latest.is_populated() {
                    warn!("Serving 502, cache is empty: {}", e);
                    return Err(e.into());
                }
                latest
            }
        };
    }

    Ok(Json(DataResponse {
        updated_at: snapshot.updated_at,
        quotes: snapshot.quotes.as_ref().clone(),
        refresh_ms,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct RefreshQuery {
    minutes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RefreshBody {
    minutes: Option<serde_json::Value>,
}

/// POST /api/settings/refresh
async fn refresh_settings_handler(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
    body: Bytes,
) -> Result<Json<RefreshSettings>, ApiError> {
    let cadence = requested_cadence(&query, &body)?;
    if state.scheduler.set_interval(cadence) {
        info!("Cadence set to {} minutes via API", cadence.as_minutes());
    }
    Ok(Json(RefreshSettings {
        refresh_ms: cadence.as_millis(),
        refresh_minutes: cadence.as_minutes(),
    }))
}

/// Body `minutes` wins over the query string.
fn requested_cadence(query: &RefreshQuery, body: &[u8]) -> Result<RefreshCadence, QuoteError> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let parsed: RefreshBody = serde_json::from_slice(body)
            .map_err(|e| QuoteError::Validation(format!("malformed body: {}", e)))?;
        parsed.minutes.filter(|v| !v.is_null())
    };

    match (from_body, query.minutes.as_deref()) {
        (Some(serde_json::Value::Number(n)), _) => {
            let minutes = n
                .as_f64()
                .ok_or_else(|| QuoteError::Validation(format!("minutes must be a number, got {}", n)))?;
            RefreshCadence::from_minutes(minutes)
        }
        (Some(serde_json::Value::String(s)), _) => RefreshCadence::parse_minutes(&s),
        (Some(other), _) => Err(QuoteError::Validation(format!(
            "minutes must be a number, got {}",
            other
        ))),
        (None, Some(raw)) => RefreshCadence::parse_minutes(raw),
        (None, None) => Err(QuoteError::Validation("minutes is required".to_string())),
    }
}

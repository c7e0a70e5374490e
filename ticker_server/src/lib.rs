//! Quote ticker server.
//!
//! Keeps a small set of quotes fresh with bounded provider cost and serves them over HTTP:
//!
//! - `provider` — `QuoteFetcher`, the upstream boundary, and its Yahoo chart implementation.
//! - `model::cache` — `QuoteCache`, stale-while-revalidate storage with single-flight refreshes.
//! - `model::scheduler` — `RefreshScheduler`, the background timer bound to a mutable cadence.
//! - `routes` — the axum router exposing `/api/data` and `/api/settings/refresh`.
//! - `args`, `error` — CLI configuration and the binary's error type.
#![warn(missing_docs)]
use std::sync::Arc;
use std::time::Duration;

use ticker_common::{RefreshCadence, Symbol};

pub mod args;
pub mod error;
pub mod model;
pub mod provider;
pub mod routes;

use crate::model::cache::QuoteCache;
use crate::model::config::RefreshConfig;
use crate::model::scheduler::RefreshScheduler;
use crate::provider::QuoteFetcher;
use crate::routes::AppState;

/// Wire a cache and an idle scheduler around `fetcher`.
///
/// The scheduler is not started; call `state.scheduler.start(cadence)` to arm it.
pub fn app_state(
    fetcher: Arc<dyn QuoteFetcher>,
    symbols: Vec<Symbol>,
    cadence: RefreshCadence,
    refresh_timeout: Duration,
) -> AppState {
    let config = RefreshConfig::new(cadence);
    let cache = QuoteCache::new(fetcher, symbols, config.clone(), refresh_timeout);
    let scheduler = Arc::new(RefreshScheduler::new(cache.clone(), config));
    AppState { cache, scheduler }
}

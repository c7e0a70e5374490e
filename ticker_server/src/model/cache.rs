//! Quote cache with single-flight refreshes.
//!
//! The cache keeps the last good quote set and serves it until a refresh succeeds
//! (stale-while-revalidate). Refreshes are coordinated through a `Flight` slot:
//!
//! - `Flight::Idle` — nothing running; the next refresh request starts one.
//! - `Flight::InFlight(fut)` — a refresh is running; every new request awaits `fut` instead of
//!   issuing another fetch burst.
//!
//! The refresh future is driven by its own task, so it always runs to completion even if every
//! caller awaiting it goes away. The slot returns to `Idle` in the same critical section that
//! commits the outcome, so a caller never attaches to a finished refresh and misses its result.
//!
//! Lock order is `flight` then `state`; neither lock is held across an await.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::DateTime;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use ticker_common::quote::now_millis;
use ticker_common::{Quote, QuoteError, Symbol};
use tokio::time::Instant;

use crate::model::config::RefreshConfig;
use crate::provider::QuoteFetcher;

/// Upper bound on a whole refresh burst when none is configured.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Data this close to the end of its freshness window already counts as stale, so a timer
/// tick landing one period after the last burst always refreshes.
pub const FRESHNESS_SLACK: Duration = Duration::from_secs(1);

type RefreshFuture = Shared<BoxFuture<'static, Result<CacheSnapshot, QuoteError>>>;

enum Flight {
    Idle,
    InFlight(RefreshFuture),
}

/// Read-only view of the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    /// Last good quote set, in configured symbol order.
    pub quotes: Arc<Vec<Quote>>,
    /// Epoch milliseconds of the last successful refresh; 0 if never populated.
    pub updated_at: u64,
    /// Error of the most recent failed refresh, cleared by the next success.
    pub last_error: Option<QuoteError>,
    /// Whether a refresh was running when the snapshot was taken.
    pub refresh_in_flight: bool,
}

impl CacheSnapshot {
    /// `true` once at least one refresh has succeeded.
    pub fn is_populated(&self) -> bool {
        self.updated_at != 0
    }
}

/// Result of a successful [`QuoteCache::refresh`].
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The cached data was fresh enough; nothing was fetched.
    Hit(CacheSnapshot),
    /// A fetch burst completed (started by this caller or joined) and replaced the quotes.
    Refreshed(CacheSnapshot),
}

impl RefreshOutcome {
    /// Snapshot carried by either variant.
    pub fn snapshot(&self) -> &CacheSnapshot {
        match self {
            RefreshOutcome::Hit(snapshot) | RefreshOutcome::Refreshed(snapshot) => snapshot,
        }
    }
}

#[derive(Default)]
struct CacheState {
    quotes: Arc<Vec<Quote>>,
    updated_at: u64,
    refreshed_at: Option<Instant>,
    last_error: Option<QuoteError>,
}

impl CacheState {
    fn snapshot(&self, refresh_in_flight: bool) -> CacheSnapshot {
        CacheSnapshot {
            quotes: Arc::clone(&self.quotes),
            updated_at: self.updated_at,
            last_error: self.last_error.clone(),
            refresh_in_flight,
        }
    }
}

struct Inner {
    fetcher: Arc<dyn QuoteFetcher>,
    symbols: Vec<Symbol>,
    config: RefreshConfig,
    timeout: Duration,
    flight: Mutex<Flight>,
    state: RwLock<CacheState>,
    bursts: AtomicU64,
}

/// Shared quote cache. Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct QuoteCache {
    inner: Arc<Inner>,
}

impl QuoteCache {
    /// Create an empty cache for `symbols`.
    ///
    /// `config` supplies the freshness window; `timeout` bounds every fetch burst.
    pub fn new(
        fetcher: Arc<dyn QuoteFetcher>,
        symbols: Vec<Symbol>,
        config: RefreshConfig,
        timeout: Duration,
    ) -> Self {
        QuoteCache {
            inner: Arc::new(Inner {
                fetcher,
                symbols,
                config,
                timeout,
                flight: Mutex::new(Flight::Idle),
                state: RwLock::new(CacheState::default()),
                bursts: AtomicU64::new(0),
            }),
        }
    }

    /// Configured symbols.
    pub fn symbols(&self) -> &[Symbol] {
        &self.inner.symbols
    }

    /// Number of fetch bursts started so far.
    pub fn burst_count(&self) -> u64 {
        self.inner.bursts.load(Ordering::Acquire)
    }

    /// Current state of the cache.
    pub fn snapshot(&self) -> CacheSnapshot {
        let flight = self.inner.flight.lock();
        let in_flight = matches!(*flight, Flight::InFlight(_));
        self.inner.state.read().snapshot(in_flight)
    }

    /// Refresh the cached quotes.
    ///
    /// Without `force`, a populated cache younger than the configured cadence is returned as
    /// a [`RefreshOutcome::Hit`]. A refresh already in flight is joined rather than duplicated.
    /// On failure the previous quotes stay in place and the error is recorded.
    pub async fn refresh(&self, force: bool) -> Result<RefreshOutcome, QuoteError> {
        let (flight, started) = {
            let mut slot = self.inner.flight.lock();
            let joined = match &*slot {
                Flight::InFlight(running) => Some(running.clone()),
                Flight::Idle => None,
            };
            match joined {
                Some(running) => {
                    debug!("Joining in-flight refresh");
                    (running, false)
                }
                None => {
                    if !force {
                        let state = self.inner.state.read();
                        if self.inner.is_fresh(&state) {
                            debug!("Cache hit, data is fresh enough");
                            return Ok(RefreshOutcome::Hit(state.snapshot(false)));
                        }
                    }
                    let running = Inner::run_refresh(Arc::clone(&self.inner))
                        .boxed()
                        .shared();
                    *slot = Flight::InFlight(running.clone());
                    (running, true)
                }
            }
        };
        // The slot stays `InFlight` until the spawned task commits.
        if started {
            tokio::spawn(flight.clone());
        }

        flight.await.map(RefreshOutcome::Refreshed)
    }

    /// Fetch `symbols` in parallel without reading or touching the shared cache.
    pub async fn refresh_for(&self, symbols: &[Symbol]) -> Result<Vec<Quote>, QuoteError> {
        let timeout = self.inner.timeout;
        match tokio::time::timeout(timeout, fetch_all(self.inner.fetcher.as_ref(), symbols)).await {
            Ok(result) => result,
            Err(_) => Err(QuoteError::Timeout(timeout.as_millis() as u64)),
        }
    }
}

impl Inner {
    fn is_fresh(&self, state: &CacheState) -> bool {
        match state.refreshed_at {
            Some(at) => at.elapsed() + FRESHNESS_SLACK < self.config.cadence().as_duration(),
            None => false,
        }
    }

    async fn run_refresh(inner: Arc<Inner>) -> Result<CacheSnapshot, QuoteError> {
        inner.bursts.fetch_add(1, Ordering::AcqRel);
        // Freshness is measured from the start of the burst, the same instant a timer armed
        // alongside it measures its period from.
        let started = Instant::now();
        let fetched =
            match tokio::time::timeout(inner.timeout, fetch_all(inner.fetcher.as_ref(), &inner.symbols))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(QuoteError::Timeout(inner.timeout.as_millis() as u64)),
            };

        let mut slot = inner.flight.lock();
        let outcome = {
            let mut state = inner.state.write();
            match fetched {
                Ok(quotes) => {
                    state.quotes = Arc::new(quotes);
                    state.updated_at = now_millis();
                    state.refreshed_at = Some(started);
                    state.last_error = None;
                    info!(
                        "Refreshed {} quotes at {}",
                        state.quotes.len(),
                        DateTime::from_timestamp_millis(state.updated_at as i64)
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_default()
                    );
                    Ok(state.snapshot(false))
                }
                Err(e) => {
                    warn!(
                        "Refresh failed, keeping {} cached quotes: {}",
                        state.quotes.len(),
                        e
                    );
                    state.last_error = Some(e.clone());
                    Err(e)
                }
            }
        };
        *slot = Flight::Idle;
        outcome
    }
}

/// Fetch every symbol concurrently; the first failure fails the whole burst.
async fn fetch_all(fetcher: &dyn QuoteFetcher, symbols: &[Symbol]) -> Result<Vec<Quote>, QuoteError> {
    if symbols.is_empty() {
        return Err(QuoteError::NoSymbols);
    }
    future::try_join_all(symbols.iter().map(|symbol| fetcher.fetch(symbol))).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use ticker_common::RefreshCadence;
    use ticker_common::symbols::parse_symbol_list;

    /// Deterministic in-memory fetcher.
    #[derive(Default)]
    pub(crate) struct MockFetcher {
        pub calls: AtomicUsize,
        pub delay: Mutex<Duration>,
        pub failing: Mutex<HashSet<String>>,
        pub price: Mutex<f64>,
    }

    impl MockFetcher {
        pub(crate) fn new(price: f64) -> Arc<Self> {
            let fetcher = MockFetcher::default();
            *fetcher.price.lock() = price;
            Arc::new(fetcher)
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn fail(&self, symbol: &str) {
            self.failing.lock().insert(symbol.to_string());
        }

        pub(crate) fn heal(&self) {
            self.failing.lock().clear();
        }
    }

    #[async_trait]
    impl QuoteFetcher for MockFetcher {
        async fn fetch(&self, symbol: &Symbol) -> Result<Quote, QuoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.failing.lock().contains(symbol.as_str()) {
                return Err(QuoteError::Status {
                    symbol: symbol.to_string(),
                    status: 500,
                });
            }
            let price = *self.price.lock();
            Ok(Quote::new(symbol.as_str(), Some(price), Some(100.0), "USD", Some(1)))
        }
    }

    pub(crate) fn symbols(raw: &str) -> Vec<Symbol> {
        parse_symbol_list(raw).unwrap()
    }

    fn cache_with(fetcher: Arc<MockFetcher>, raw: &str) -> QuoteCache {
        QuoteCache::new(
            fetcher,
            symbols(raw),
            RefreshConfig::new(RefreshCadence::default()),
            DEFAULT_REFRESH_TIMEOUT,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn first_refresh_populates_and_fresh_cache_is_a_hit() {
        let fetcher = MockFetcher::new(110.0);
        let cache = cache_with(fetcher.clone(), "AAPL,MSFT");
        assert!(!cache.snapshot().is_populated());

        let outcome = cache.refresh(false).await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Refreshed(_)));
        let snapshot = cache.snapshot();
        assert!(snapshot.is_populated());
        assert_eq!(snapshot.quotes.len(), 2);
        assert_eq!(snapshot.quotes[0].symbol, "AAPL");
        assert_eq!(snapshot.quotes[1].symbol, "MSFT");
        assert!(!snapshot.refresh_in_flight);
        assert_eq!(fetcher.calls(), 2);

        let hit = cache.refresh(false).await.unwrap();
        assert!(matches!(hit, RefreshOutcome::Hit(_)));
        assert_eq!(fetcher.calls(), 2);

        cache.refresh(true).await.unwrap();
        assert_eq!(fetcher.calls(), 4);
        assert_eq!(cache.burst_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_cache_refetches_without_force() {
        let fetcher = MockFetcher::new(110.0);
        let cache = cache_with(fetcher.clone(), "AAPL");
        cache.refresh(false).await.unwrap();

        tokio::time::advance(RefreshCadence::default().as_duration()).await;
        let outcome = cache.refresh(false).await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Refreshed(_)));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn freshness_counts_from_the_start_of_a_slow_burst() {
        let fetcher = MockFetcher::new(110.0);
        *fetcher.delay.lock() = Duration::from_secs(2);
        let cache = cache_with(fetcher.clone(), "AAPL");
        let cadence = RefreshCadence::default().as_duration();

        cache.refresh(true).await.unwrap();
        // Two seconds of the window went to the fetch itself.
        tokio::time::advance(cadence - Duration::from_secs(10)).await;
        let hit = cache.refresh(false).await.unwrap();
        assert!(matches!(hit, RefreshOutcome::Hit(_)));
        assert_eq!(fetcher.calls(), 1);

        // Half a second short of one period after the burst started.
        tokio::time::advance(Duration::from_millis(7_500)).await;
        let outcome = cache.refresh(false).await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Refreshed(_)));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_failure_keeps_previous_quotes() {
        let fetcher = MockFetcher::new(110.0);
        let cache = cache_with(fetcher.clone(), "AAPL,MSFT,TSLA");
        cache.refresh(true).await.unwrap();
        let before = cache.snapshot();

        *fetcher.price.lock() = 120.0;
        fetcher.fail("MSFT");
        let err = cache.refresh(true).await.unwrap_err();
        assert_eq!(
            err,
            QuoteError::Status {
                symbol: "MSFT".to_string(),
                status: 500
            }
        );

        let after = cache.snapshot();
        assert_eq!(after.quotes, before.quotes);
        assert_eq!(after.updated_at, before.updated_at);
        assert_eq!(after.last_error, Some(err));

        fetcher.heal();
        cache.refresh(true).await.unwrap();
        let healed = cache.snapshot();
        assert_eq!(healed.last_error, None);
        assert!(healed.quotes.iter().all(|q| q.price == Some(120.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_before_first_success_leaves_cache_empty() {
        let fetcher = MockFetcher::new(110.0);
        fetcher.fail("AAPL");
        let cache = cache_with(fetcher, "AAPL");

        assert!(cache.refresh(false).await.is_err());
        let snapshot = cache.snapshot();
        assert!(!snapshot.is_populated());
        assert!(snapshot.quotes.is_empty());
        assert!(snapshot.last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_share_one_burst() {
        let fetcher = MockFetcher::new(110.0);
        *fetcher.delay.lock() = Duration::from_secs(2);
        let cache = cache_with(fetcher.clone(), "AAPL,MSFT");

        let first = cache.clone();
        let second = cache.clone();
        let (a, b) = tokio::join!(first.refresh(true), second.refresh(true));

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.burst_count(), 1);
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn joined_callers_observe_the_same_failure() {
        let fetcher = MockFetcher::new(110.0);
        *fetcher.delay.lock() = Duration::from_secs(1);
        fetcher.fail("AAPL");
        let cache = cache_with(fetcher.clone(), "AAPL");

        let (a, b) = tokio::join!(cache.refresh(true), cache.refresh(false));
        assert_eq!(a.unwrap_err(), b.unwrap_err());
        assert_eq!(cache.burst_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_reports_in_flight_refresh() {
        let fetcher = MockFetcher::new(110.0);
        *fetcher.delay.lock() = Duration::from_secs(5);
        let cache = cache_with(fetcher, "AAPL");

        let background = cache.clone();
        let handle = tokio::spawn(async move { background.refresh(true).await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(cache.snapshot().refresh_in_flight);

        handle.await.unwrap().unwrap();
        assert!(!cache.snapshot().refresh_in_flight);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_refresh_still_completes() {
        let fetcher = MockFetcher::new(110.0);
        *fetcher.delay.lock() = Duration::from_secs(5);
        let cache = cache_with(fetcher.clone(), "AAPL");

        let abandoned = tokio::time::timeout(Duration::from_secs(1), cache.refresh(true)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(10)).await;
        let snapshot = cache.snapshot();
        assert!(snapshot.is_populated());
        assert!(!snapshot.refresh_in_flight);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_provider_times_out_and_releases_the_slot() {
        let fetcher = MockFetcher::new(110.0);
        *fetcher.delay.lock() = Duration::from_secs(60);
        let cache = QuoteCache::new(
            fetcher.clone(),
            symbols("AAPL"),
            RefreshConfig::default(),
            Duration::from_secs(3),
        );

        assert_eq!(cache.refresh(true).await.unwrap_err(), QuoteError::Timeout(3_000));
        assert!(!cache.snapshot().refresh_in_flight);

        *fetcher.delay.lock() = Duration::ZERO;
        assert!(cache.refresh(true).await.is_ok());
        assert_eq!(cache.burst_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_for_bypasses_shared_state() {
        let fetcher = MockFetcher::new(110.0);
        let cache = cache_with(fetcher.clone(), "AAPL");

        let quotes = cache.refresh_for(&symbols("TSLA,NVDA")).await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].symbol, "TSLA");
        assert!(!cache.snapshot().is_populated());
        assert_eq!(cache.burst_count(), 0);

        fetcher.fail("NVDA");
        assert!(cache.refresh_for(&symbols("TSLA,NVDA")).await.is_err());
        assert!(cache.snapshot().last_error.is_none());

        assert_eq!(cache.refresh_for(&[]).await.unwrap_err(), QuoteError::NoSymbols);
    }
}

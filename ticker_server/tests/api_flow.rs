use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use ticker_common::net::{DATA_PATH, REFRESH_SETTINGS_PATH, endpoint};
use ticker_common::symbols::parse_symbol_list;
use ticker_common::{DataResponse, ErrorResponse, Quote, QuoteError, RefreshCadence, RefreshSettings, Symbol};
use ticker_server::provider::QuoteFetcher;
use ticker_server::routes::{AppState, router};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct ScriptedFetcher {
    calls: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

impl ScriptedFetcher {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self, symbol: &str) {
        self.failing
            .lock()
            .expect("failing set lock")
            .insert(symbol.to_string());
    }
}

#[async_trait]
impl QuoteFetcher for ScriptedFetcher {
    async fn fetch(&self, symbol: &Symbol) -> Result<Quote, QuoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing
            .lock()
            .expect("failing set lock")
            .contains(symbol.as_str());
        if failing {
            return Err(QuoteError::EmptyResult(symbol.to_string()));
        }
        Ok(Quote::new(symbol.as_str(), Some(189.87), Some(187.5), "USD", Some(1_700_000_000_000)))
    }
}

struct TestServer {
    base_url: String,
    state: AppState,
    fetcher: Arc<ScriptedFetcher>,
    client: reqwest::Client,
    shutdown_tx: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(symbols: &str, minutes: f64) -> Self {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let cadence = RefreshCadence::from_minutes(minutes).expect("valid cadence");
        let state = ticker_server::app_state(
            fetcher.clone(),
            parse_symbol_list(symbols).expect("valid symbols"),
            cadence,
            Duration::from_secs(2),
        );
        state.scheduler.start(cadence);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let address: SocketAddr = listener.local_addr().expect("test listener local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(state.clone());
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            server.await.expect("run test server");
        });

        TestServer {
            base_url: format!("http://{address}"),
            state,
            fetcher,
            client: reqwest::Client::new(),
            shutdown_tx,
            handle,
        }
    }

    async fn get(&self, query: &str) -> reqwest::Response {
        let url = format!("{}{}", endpoint(&self.base_url, DATA_PATH), query);
        timeout(TEST_TIMEOUT, self.client.get(url).send())
            .await
            .expect("request finished in time")
            .expect("request sent")
    }

    async fn post_settings(&self, query: &str, body: Option<serde_json::Value>) -> reqwest::Response {
        let url = format!("{}{}", endpoint(&self.base_url, REFRESH_SETTINGS_PATH), query);
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        timeout(TEST_TIMEOUT, request.send())
            .await
            .expect("request finished in time")
            .expect("request sent")
    }

    async fn stop(self) {
        self.state.scheduler.shutdown().await;
        let _ = self.shutdown_tx.send(());
        self.handle.await.expect("server task");
    }
}

#[tokio::test]
async fn first_request_populates_the_cache() {
    let server = TestServer::spawn("AAPL,MSFT", 30.0).await;

    let response = server.get("").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: DataResponse = response.json().await.expect("data body");
    assert!(body.updated_at > 0);
    assert_eq!(body.refresh_ms, 30 * 60_000);
    let symbols: Vec<&str> = body.quotes.iter().map(|q| q.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    assert_eq!(server.fetcher.calls(), 2);

    // Served from cache now.
    let again: DataResponse = server.get("").await.json().await.expect("data body");
    assert_eq!(again, body);
    assert_eq!(server.fetcher.calls(), 2);

    server.stop().await;
}

#[tokio::test]
async fn empty_cache_with_failing_provider_is_bad_gateway() {
    let server = TestServer::spawn("AAPL", 30.0).await;
    server.fetcher.fail("AAPL");

    let response = server.get("").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: ErrorResponse = response.json().await.expect("error body");
    assert!(body.error.contains("AAPL"));

    server.stop().await;
}

#[tokio::test]
async fn stale_quotes_survive_a_failed_refresh() {
    let server = TestServer::spawn("AAPL", 30.0).await;
    let first: DataResponse = server.get("").await.json().await.expect("data body");

    server.fetcher.fail("AAPL");
    let response = server.post_settings("", Some(serde_json::json!({ "minutes": 10 }))).await;
    assert_eq!(response.status(), StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server.state.cache.snapshot().last_error.is_some());

    let response = server.get("").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: DataResponse = response.json().await.expect("data body");
    assert_eq!(body.quotes, first.quotes);
    assert_eq!(body.updated_at, first.updated_at);
    assert_eq!(body.refresh_ms, 10 * 60_000);

    server.stop().await;
}

#[tokio::test]
async fn explicit_symbols_bypass_the_cache() {
    let server = TestServer::spawn("AAPL", 30.0).await;

    let response = server.get("?symbols=tsla,nvda").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: DataResponse = response.json().await.expect("data body");
    let symbols: Vec<&str> = body.quotes.iter().map(|q| q.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["TSLA", "NVDA"]);
    assert!(!server.state.cache.snapshot().is_populated());

    server.fetcher.fail("NVDA");
    let response = server.get("?symbols=TSLA,NVDA").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(server.state.cache.snapshot().last_error.is_none());

    let response = server.get("?symbols=AAPL,%3Cbad%3E").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn cadence_changes_are_validated_and_applied() {
    let server = TestServer::spawn("AAPL", 30.0).await;

    let response = server.post_settings("", Some(serde_json::json!({ "minutes": 3 }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = server.post_settings("?minutes=abc", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = server.post_settings("?minutes=721", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.state.scheduler.cadence().as_minutes(), 30.0);
    assert_eq!(server.fetcher.calls(), 0);

    let response = server.post_settings("", Some(serde_json::json!({ "minutes": 15 }))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let settings: RefreshSettings = response.json().await.expect("settings body");
    assert_eq!(settings.refresh_ms, 900_000);
    assert_eq!(settings.refresh_minutes, 15.0);
    assert_eq!(server.state.scheduler.cadence().as_minutes(), 15.0);

    // The forced refresh lands without any client request.
    let mut populated = false;
    for _ in 0..50 {
        if server.state.cache.snapshot().is_populated() {
            populated = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(populated);
    assert_eq!(server.state.scheduler.live_timers(), 1);

    let response = server.post_settings("?minutes=60", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: DataResponse = server.get("").await.json().await.expect("data body");
    assert_eq!(body.refresh_ms, 3_600_000);

    server.stop().await;
}

#[tokio::test(flavor = "current_thread")]
async fn warm_up_and_requests_share_one_thread() {
    let server = TestServer::spawn("AAPL,MSFT", 30.0).await;

    // Same startup order as the binary: timer armed, then a background warm-up.
    let warm_cache = server.state.cache.clone();
    let warm_up = tokio::spawn(async move { warm_cache.refresh(true).await });
    tokio::task::yield_now().await;

    let response = server.get("").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: DataResponse = response.json().await.expect("data body");
    assert_eq!(body.quotes.len(), 2);
    assert!(warm_up.await.expect("warm-up task").is_ok());
    assert_eq!(server.fetcher.calls(), 2, "request reused the warm-up burst");
    assert_eq!(server.state.cache.burst_count(), 1);

    server.stop().await;
}

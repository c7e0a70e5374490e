//! Quote ticker HTTP server.
//!
//! This binary keeps a configured set of stock quotes cached and serves them as JSON.
//! Internally, it wires together three main building blocks:
//!
//! - `YahooFetcher` — fetches one quote per symbol from the chart API.
//! - `QuoteCache` — holds the last good quote set; concurrent refresh requests share one
//!   fetch burst, and failed refreshes keep serving the previous data.
//! - `RefreshScheduler` — a background timer refreshing the cache at a cadence that can be
//!   changed at runtime through `POST /api/settings/refresh`.
//!
//! Shutdown:
//! - Ctrl+C or SIGTERM stops accepting connections, lets in-flight requests finish, then
//!   stops the refresh timer before the process exits.
//!
//! Usage example:
//! ```bash
//! ticker_server --port 3000 --symbols AAPL,MSFT,TSLA --refresh-minutes 15
//! ```
#![warn(missing_docs)]
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use tokio::net::TcpListener;

use ticker_server::args::Args;
use ticker_server::error::ServerError;
use ticker_server::provider::YahooFetcher;
use ticker_server::routes::router;

/// Slack added on top of the per-request timeout for a whole parallel burst.
const BURST_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ServerError> {
    init_logger();
    let args = Args::parse();

    let symbols = args.resolve_symbols()?;
    let cadence = args.cadence()?;
    let fetch_timeout = args.fetch_timeout()?;
    info!(
        "Serving {} symbols, refresh every {} minutes",
        symbols.len(),
        cadence.as_minutes()
    );

    let fetcher = Arc::new(YahooFetcher::new(&args.provider_url, fetch_timeout)?);
    let state = ticker_server::app_state(
        fetcher,
        symbols,
        cadence,
        fetch_timeout + BURST_TIMEOUT_SLACK,
    );
    state.scheduler.start(cadence);

    let warm_cache = state.cache.clone();
    tokio::spawn(async move {
        if let Err(e) = warm_cache.refresh(true).await {
            warn!("Initial refresh failed: {}", e);
        }
    });

    let ip: IpAddr = args.bind.parse()?;
    let listener = TcpListener::bind(SocketAddr::new(ip, args.port)).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);

    let served = axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    state.scheduler.shutdown().await;
    if let Err(e) = &served {
        error!("HTTP server failed: {}", e);
    }
    served?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received. Shutting down server..."),
        _ = terminate => info!("SIGTERM received. Shutting down server..."),
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

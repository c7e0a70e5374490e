//! Ticker Client — polls a ticker server over HTTP and scrolls the quotes across the
//! terminal as a dot-matrix strip.
//!
//! Everything runs on one thread: a frame timer drives the scroll renderer, the poll timer
//! (following the cadence the server reports) triggers snapshot fetches, and network calls
//! run as spawned tasks that report back over a channel so painting never waits on I/O.
//!
//! Keys: `m` toggles single/dual layout, `+`/`-` ask the server for a 5 minute longer or
//! shorter refresh cadence, `q`, `Esc` or `Ctrl+C` quit.
//!
//! Usage example (CLI):
//! ```bash
//! ticker_client --server http://127.0.0.1:3000 --mode dual --scroll-ms 40
//! ```
#![warn(missing_docs)]
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::{self, Event};
use log::{debug, info};
use ticker_common::{DataResponse, RefreshSettings, Symbol};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use ticker_client::api::ApiClient;
use ticker_client::args::Args;
use ticker_client::compositor::TextCompositor;
use ticker_client::display::{TerminalCanvas, TerminalSession};
use ticker_client::error::{ClientError, Result};
use ticker_client::keys::{KeyAction, key_action};
use ticker_client::poller::ClientPoller;
use ticker_client::scroll::ScrollRenderer;

/// Render loop period; independent of the scroll step.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Replies from spawned network tasks.
enum NetEvent {
    Data(Result<DataResponse>),
    Settings(Result<RefreshSettings>),
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.log_file.as_deref())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let symbols = args.ad_hoc_symbols()?;
    let api = ApiClient::new(&args.server)?;
    let compositor = TextCompositor::new(args.height)?;
    let mut poller = ClientPoller::new(compositor, args.mode);
    let mut scroll = ScrollRenderer::new(
        poller.reel(),
        args.scroll_interval(),
        args.width,
        Instant::now(),
    )?;
    info!("Polling {}", api.base_url());

    let session = TerminalSession::enter()?;
    let mut canvas = TerminalCanvas::new(io::stdout());
    canvas.set_status(poller.status());
    scroll.repaint(&mut canvas)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<NetEvent>();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut fetching = false;

    loop {
        tokio::select! {
            _ = frames.tick() => {
                if let Some(action) = pending_key()? {
                    match action {
                        KeyAction::Quit => break,
                        KeyAction::ToggleMode => {
                            scroll.set_reel(poller.toggle_mode(), Instant::now());
                            scroll.repaint(&mut canvas)?;
                        }
                        KeyAction::AdjustCadence(delta) => {
                            match poller.request_cadence(delta) {
                                Ok(cadence) => {
                                    let api = api.clone();
                                    let tx = tx.clone();
                                    tokio::spawn(async move {
                                        let reply = api.set_refresh_cadence(cadence).await;
                                        let _ = tx.send(NetEvent::Settings(reply));
                                    });
                                }
                                Err(e) => poller.on_settings_error(&e),
                            }
                            canvas.set_status(poller.status());
                            scroll.repaint(&mut canvas)?;
                        }
                    }
                }
                scroll.on_frame(Instant::now(), &mut canvas)?;
            }
            _ = poller.tick() => {
                if fetching {
                    debug!("Previous poll still running, skipping");
                    continue;
                }
                fetching = true;
                spawn_fetch(&api, symbols.clone(), &tx);
            }
            Some(event) = rx.recv() => {
                match event {
                    NetEvent::Data(Ok(data)) => {
                        fetching = false;
                        let outcome = poller.on_data(&data);
                        scroll.set_reel(outcome.reel, Instant::now());
                    }
                    NetEvent::Data(Err(e)) => {
                        fetching = false;
                        poller.on_error(&e);
                    }
                    NetEvent::Settings(Ok(settings)) => {
                        poller.on_settings_ack(&settings);
                    }
                    NetEvent::Settings(Err(e)) => poller.on_settings_error(&e),
                }
                canvas.set_status(poller.status());
                scroll.repaint(&mut canvas)?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received. Shutting down client...");
                break;
            }
        }
    }

    session.restore()?;
    info!("Client stopped");
    Ok(())
}

fn spawn_fetch(api: &ApiClient, symbols: Option<Vec<Symbol>>, tx: &mpsc::UnboundedSender<NetEvent>) {
    let api = api.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let reply = api.fetch_data(symbols.as_deref()).await;
        let _ = tx.send(NetEvent::Data(reply));
    });
}

/// Drain queued terminal events without blocking and return the first bound key.
fn pending_key() -> Result<Option<KeyAction>> {
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            if let Some(action) = key_action(key) {
                return Ok(Some(action));
            }
        }
    }
    Ok(None)
}

fn init_logger(log_file: Option<&Path>) -> Result<(), ClientError> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Warn).parse_default_env();
    if let Some(path) = log_file {
        let file = File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

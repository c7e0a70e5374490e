//! Background refresh timer.
//!
//! The scheduler is either idle (no timer) or armed (one timer task ticking at the configured
//! cadence). Each armed timer owns a `CancellationToken`; re-arming cancels the previous token
//! before spawning the replacement, so two timers never tick side by side. A tick that is
//! already awaiting a refresh when its timer is cancelled finishes that refresh, then exits
//! without ticking again.
//!
//! Ticks call `QuoteCache::refresh(false)`. Failures are logged and the timer keeps going.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use log::{debug, info, warn};
use parking_lot::Mutex;
use ticker_common::RefreshCadence;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::model::cache::{QuoteCache, RefreshOutcome};
use crate::model::config::RefreshConfig;

struct Timer {
    cadence: RefreshCadence,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the refresh timer and the live cadence.
pub struct RefreshScheduler {
    cache: QuoteCache,
    config: RefreshConfig,
    timer: Mutex<Option<Timer>>,
    ticks: Arc<AtomicU64>,
    live: Arc<AtomicUsize>,
}

impl RefreshScheduler {
    /// Create an idle scheduler driving `cache` with the cadence held in `config`.
    pub fn new(cache: QuoteCache, config: RefreshConfig) -> Self {
        RefreshScheduler {
            cache,
            config,
            timer: Mutex::new(None),
            ticks: Arc::new(AtomicU64::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current cadence.
    pub fn cadence(&self) -> RefreshCadence {
        self.config.cadence()
    }

    /// `true` while a timer is installed.
    pub fn is_armed(&self) -> bool {
        self.timer.lock().is_some()
    }

    /// Number of ticks fired so far, across all timers.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Number of timer tasks that have not exited yet.
    pub fn live_timers(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Arm the timer at `cadence`, replacing any running timer.
    pub fn start(&self, cadence: RefreshCadence) {
        let mut slot = self.timer.lock();
        self.config.replace(cadence);
        self.arm(&mut slot, cadence);
    }

    /// Change the cadence.
    ///
    /// Returns `false` and does nothing if `cadence` is already in effect on an armed timer.
    /// Otherwise the timer is re-armed at the new cadence and one forced refresh is started
    /// right away.
    pub fn set_interval(&self, cadence: RefreshCadence) -> bool {
        let mut slot = self.timer.lock();
        let unchanged = slot
            .as_ref()
            .is_some_and(|timer| timer.cadence == cadence);
        if unchanged {
            debug!("Refresh cadence unchanged at {} ms", cadence.as_millis());
            return false;
        }

        let previous = self.config.replace(cadence);
        info!(
            "Refresh cadence changed from {} to {} minutes",
            previous.as_minutes(),
            cadence.as_minutes()
        );
        self.arm(&mut slot, cadence);
        drop(slot);

        let cache = self.cache.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.refresh(true).await {
                warn!("Refresh after cadence change failed: {}", e);
            }
        });
        true
    }

    /// Cancel the timer and go idle.
    pub fn stop(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.cancel.cancel();
            info!("Refresh timer stopped");
        }
    }

    /// Stop the timer and wait for its task to exit, letting an in-flight tick finish.
    ///
    /// Used at process shutdown so no tick outlives the server.
    pub async fn shutdown(&self) {
        let timer = self.timer.lock().take();
        if let Some(timer) = timer {
            timer.cancel.cancel();
            info!("Refresh timer stopped, waiting for the last tick");
            if let Err(e) = timer.task.await {
                warn!("Refresh timer task ended abnormally: {}", e);
            }
        }
    }

    fn arm(&self, slot: &mut Option<Timer>, cadence: RefreshCadence) {
        if let Some(old) = slot.take() {
            old.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_timer(
            self.cache.clone(),
            cadence,
            cancel.clone(),
            Arc::clone(&self.ticks),
            LiveGuard::enter(Arc::clone(&self.live)),
        ));
        *slot = Some(Timer {
            cadence,
            cancel,
            task,
        });
        info!("Refresh timer armed every {} minutes", cadence.as_minutes());
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.cancel.cancel();
        }
    }
}

/// Counts a timer task as live from spawn until it exits or is dropped.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn enter(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::AcqRel);
        LiveGuard(live)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

async fn run_timer(
    cache: QuoteCache,
    cadence: RefreshCadence,
    cancel: CancellationToken,
    ticks: Arc<AtomicU64>,
    _live: LiveGuard,
) {
    let period = cadence.as_duration();
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                ticks.fetch_add(1, Ordering::AcqRel);
                match cache.refresh(false).await {
                    Ok(RefreshOutcome::Hit(_)) => debug!("Scheduled tick: cache still fresh"),
                    Ok(RefreshOutcome::Refreshed(snapshot)) => {
                        debug!("Scheduled tick refreshed {} quotes", snapshot.quotes.len())
                    }
                    Err(e) => warn!("Scheduled refresh failed: {}", e),
                }
            }
        }
    }
    debug!("Refresh timer ({} ms) exited", cadence.as_millis());
}

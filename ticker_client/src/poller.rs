//! Client-side polling state.
//!
//! `ClientPoller` owns the poll timer, the last good quote messages and the status line.
//! It performs no I/O itself: the caller fetches on every [`ClientPoller::tick`] and feeds
//! the outcome back through `on_data`/`on_error`. The server is the source of truth for the
//! cadence, so the timer is re-armed only from server replies, never from local input.
use std::time::Duration;

use log::{debug, info, warn};
use ticker_common::{DataResponse, QuoteError, RefreshCadence, RefreshSettings};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval, interval_at};

use crate::compositor::{DisplayMode, Reel, TextCompositor};
use crate::format::{format_messages, format_updated};

/// Step applied by the cadence keys, in minutes.
pub const CADENCE_STEP_MINUTES: f64 = 5.0;

/// Result of feeding a successful snapshot to the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataOutcome {
    /// Freshly composed reel.
    pub reel: Reel,
    /// The server reported a new cadence and the poll timer was re-armed.
    pub rearmed: bool,
}

/// Poll timer plus the display state derived from server replies.
#[derive(Debug)]
pub struct ClientPoller {
    compositor: TextCompositor,
    mode: DisplayMode,
    messages: Vec<String>,
    cadence: RefreshCadence,
    timer: Interval,
    updated_at: u64,
    status: String,
    pending: Option<RefreshCadence>,
}

impl ClientPoller {
    /// Poller at the default cadence. The first tick fires immediately.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(compositor: TextCompositor, mode: DisplayMode) -> Self {
        let cadence = RefreshCadence::default();
        let mut timer = interval(cadence.as_duration());
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ClientPoller {
            compositor,
            mode,
            messages: Vec::new(),
            cadence,
            timer,
            updated_at: 0,
            status: "Waiting for data".to_string(),
            pending: None,
        }
    }

    /// Wait for the next poll. Cancel safe.
    pub async fn tick(&mut self) {
        self.timer.tick().await;
    }

    /// Cadence the poll timer currently runs at.
    pub fn cadence(&self) -> RefreshCadence {
        self.cadence
    }

    /// Poll period.
    pub fn poll_interval(&self) -> Duration {
        self.cadence.as_duration()
    }

    /// Current layout.
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Status line text.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Server timestamp of the data on display (0 = none yet).
    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    /// Cadence change sent to the server and not yet acknowledged.
    pub fn pending_cadence(&self) -> Option<RefreshCadence> {
        self.pending
    }

    /// Messages currently on display.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Compose the current messages in the current mode.
    pub fn reel(&self) -> Reel {
        self.compositor.compose_messages(&self.messages, self.mode)
    }

    /// Replace the messages from a fresh snapshot and follow the server cadence.
    pub fn on_data(&mut self, data: &DataResponse) -> DataOutcome {
        self.messages = format_messages(&data.quotes);
        self.updated_at = data.updated_at;
        self.status = format_updated(data.updated_at);
        debug!("Received {} quotes", data.quotes.len());

        let rearmed = self.follow(RefreshCadence::clamped_from_ms(data.refresh_ms));
        DataOutcome {
            reel: self.reel(),
            rearmed,
        }
    }

    /// Record a failed poll. The messages (and so the reel) stay as they were.
    pub fn on_error(&mut self, err: &impl std::fmt::Display) {
        warn!("Poll failed: {}", err);
        self.status = format!("Update failed: {}", err);
    }

    /// Validate a user cadence change of `delta_minutes` and mark it pending.
    ///
    /// The local cadence is untouched until [`ClientPoller::on_settings_ack`].
    pub fn request_cadence(&mut self, delta_minutes: f64) -> Result<RefreshCadence, QuoteError> {
        let base = self.pending.unwrap_or(self.cadence);
        let target = RefreshCadence::from_minutes(base.as_minutes() + delta_minutes)?;
        self.pending = Some(target);
        self.status = format!("Requesting {} min refresh...", target.as_minutes());
        Ok(target)
    }

    /// Apply the cadence the server acknowledged. Returns `true` if the timer was re-armed.
    pub fn on_settings_ack(&mut self, settings: &RefreshSettings) -> bool {
        self.pending = None;
        let cadence = RefreshCadence::clamped_from_ms(settings.refresh_ms);
        self.status = format!("Refresh every {} min", cadence.as_minutes());
        self.follow(cadence)
    }

    /// Record a rejected or failed cadence change.
    pub fn on_settings_error(&mut self, err: &impl std::fmt::Display) {
        warn!("Cadence change failed: {}", err);
        self.pending = None;
        self.status = format!("Cadence change failed: {}", err);
    }

    /// Switch between single and dual layout and return the recomposed reel.
    pub fn toggle_mode(&mut self) -> Reel {
        self.mode = self.mode.toggled();
        info!("Display mode: {}", self.mode);
        self.reel()
    }

    fn follow(&mut self, cadence: RefreshCadence) -> bool {
        if cadence == self.cadence {
            return false;
        }
        info!(
            "Poll cadence {} -> {} minutes",
            self.cadence.as_minutes(),
            cadence.as_minutes()
        );
        self.cadence = cadence;
        let period = cadence.as_duration();
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = timer;
        true
    }
}

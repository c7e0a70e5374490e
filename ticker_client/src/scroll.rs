//! Time-paced scrolling over a reel.
//!
//! The render loop calls [`ScrollRenderer::on_frame`] as often as it likes; the offset moves
//! one column only once `interval` has elapsed since the previous step, so scroll speed does
//! not depend on how fast frames are produced.
//!
//! A reel narrower than the window is followed by blank columns up to the window width, so
//! a short message crosses the display once per cycle instead of being tiled.
use std::io;
use std::time::{Duration, Instant};

use crate::compositor::Reel;
use crate::error::RenderError;

/// Visible window width in columns.
pub const DEFAULT_WIDTH: usize = 64;
/// Default time between one-column steps.
pub const DEFAULT_SCROLL_INTERVAL: Duration = Duration::from_millis(50);

/// Something the visible window can be painted onto.
pub trait Canvas {
    /// Paint `window` (one bit column per cell, bit `r` lit for row `r`) of `height` rows.
    fn paint(&mut self, window: &[u64], height: usize) -> io::Result<()>;
}

/// Read position into the current reel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    /// Index of the leftmost visible column.
    pub offset: usize,
    /// When the offset last moved (or the reel was installed).
    pub last_step: Instant,
}

/// Steps through a reel at a fixed cadence and paints a fixed-width window.
#[derive(Debug)]
pub struct ScrollRenderer {
    reel: Reel,
    state: ScrollState,
    interval: Duration,
    width: usize,
}

impl ScrollRenderer {
    /// Renderer showing `width` columns of `reel`, stepping every `interval`.
    pub fn new(reel: Reel, interval: Duration, width: usize, now: Instant) -> Result<Self, RenderError> {
        if width == 0 {
            return Err(RenderError::Width);
        }
        Ok(ScrollRenderer {
            reel,
            state: ScrollState {
                offset: 0,
                last_step: now,
            },
            interval,
            width,
        })
    }

    /// Install a new reel and restart the scroll from its first column.
    pub fn set_reel(&mut self, reel: Reel, now: Instant) {
        self.reel = reel;
        self.state = ScrollState {
            offset: 0,
            last_step: now,
        };
    }

    /// Current reel.
    pub fn reel(&self) -> &Reel {
        &self.reel
    }

    /// Current scroll state.
    pub fn state(&self) -> ScrollState {
        self.state
    }

    /// Leftmost visible column.
    pub fn offset(&self) -> usize {
        self.state.offset
    }

    /// Time between steps.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Visible width in columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Columns in one scroll cycle: the reel, blank-padded to at least the window width.
    pub fn cycle_len(&self) -> usize {
        self.reel.len().max(self.width)
    }

    /// Step one column if at least `interval` passed since the last step.
    ///
    /// Returns `true` when the offset moved. Long gaps still move it by one column only.
    pub fn advance(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.state.last_step) < self.interval {
            return false;
        }
        self.state.offset = (self.state.offset + 1) % self.cycle_len();
        self.state.last_step = now;
        true
    }

    /// Columns currently visible, wrapping around the end of the cycle.
    pub fn window(&self) -> Vec<u64> {
        let cycle = self.cycle_len();
        let columns = self.reel.columns();
        (0..self.width)
            .map(|i| columns.get((self.state.offset + i) % cycle).copied().unwrap_or(0))
            .collect()
    }

    /// Paint the current window regardless of timing.
    pub fn repaint<C: Canvas + ?Sized>(&self, canvas: &mut C) -> io::Result<()> {
        canvas.paint(&self.window(), self.reel.height())
    }

    /// Frame callback: advance if due and repaint only when the offset moved.
    pub fn on_frame<C: Canvas + ?Sized>(&mut self, now: Instant, canvas: &mut C) -> io::Result<bool> {
        if !self.advance(now) {
            return Ok(false);
        }
        self.repaint(canvas)?;
        Ok(true)
    }
}

//! Refresh cadence bounds and validation.
//!
//! The server refreshes quotes every few minutes; the accepted window is
//! [`MIN_REFRESH_MINUTES`, `MAX_REFRESH_MINUTES`]. User input is validated strictly
//! ([`RefreshCadence::from_minutes`]), while cadences reported by the server are clamped
//! ([`RefreshCadence::clamped_from_ms`]).
use std::time::Duration;

use crate::error::QuoteError;

/// Shortest accepted cadence in minutes.
pub const MIN_REFRESH_MINUTES: f64 = 5.0;
/// Longest accepted cadence in minutes.
pub const MAX_REFRESH_MINUTES: f64 = 720.0;
/// Cadence used when nothing else is configured.
pub const DEFAULT_REFRESH_MINUTES: f64 = 15.0;

const MS_PER_MINUTE: f64 = 60_000.0;

/// A validated refresh interval, stored in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefreshCadence(u64);

impl RefreshCadence {
    /// Validate a minute count coming from user input.
    pub fn from_minutes(minutes: f64) -> Result<Self, QuoteError> {
        if !minutes.is_finite() {
            return Err(QuoteError::Validation(format!(
                "minutes must be a number, got {}",
                minutes
            )));
        }
        if !(MIN_REFRESH_MINUTES..=MAX_REFRESH_MINUTES).contains(&minutes) {
            return Err(QuoteError::Validation(format!(
                "minutes must be between {} and {}, got {}",
                MIN_REFRESH_MINUTES, MAX_REFRESH_MINUTES, minutes
            )));
        }
        Ok(RefreshCadence((minutes * MS_PER_MINUTE).round() as u64))
    }

    /// Parse and validate a raw textual minute count (query string, CLI, JSON string).
    pub fn parse_minutes(raw: &str) -> Result<Self, QuoteError> {
        let minutes: f64 = raw.trim().parse().map_err(|_| {
            QuoteError::Validation(format!("minutes must be a number, got '{}'", raw.trim()))
        })?;
        Self::from_minutes(minutes)
    }

    /// Clamp a server-reported millisecond cadence into the accepted window.
    pub fn clamped_from_ms(ms: u64) -> Self {
        let min = (MIN_REFRESH_MINUTES * MS_PER_MINUTE) as u64;
        let max = (MAX_REFRESH_MINUTES * MS_PER_MINUTE) as u64;
        RefreshCadence(ms.clamp(min, max))
    }

    /// Cadence in milliseconds.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Cadence in (possibly fractional) minutes.
    pub fn as_minutes(&self) -> f64 {
        self.0 as f64 / MS_PER_MINUTE
    }

    /// Cadence as a `Duration`.
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl Default for RefreshCadence {
    fn default() -> Self {
        RefreshCadence((DEFAULT_REFRESH_MINUTES * MS_PER_MINUTE) as u64)
    }
}

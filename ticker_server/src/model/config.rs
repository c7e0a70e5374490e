//! Shared refresh cadence.
//!
//! `RefreshConfig` holds the one mutable cadence value. Only [`RefreshScheduler`] changes it;
//! [`QuoteCache`] reads it to decide whether its snapshot is still fresh enough.
//!
//! [`RefreshScheduler`]: crate::model::scheduler::RefreshScheduler
//! [`QuoteCache`]: crate::model::cache::QuoteCache
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ticker_common::RefreshCadence;

/// Cheaply cloneable handle to the live refresh cadence.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    interval_ms: Arc<AtomicU64>,
}

impl RefreshConfig {
    /// Create a config starting at `cadence`.
    pub fn new(cadence: RefreshCadence) -> Self {
        RefreshConfig {
            interval_ms: Arc::new(AtomicU64::new(cadence.as_millis())),
        }
    }

    /// Current cadence.
    pub fn cadence(&self) -> RefreshCadence {
        RefreshCadence::clamped_from_ms(self.interval_ms.load(Ordering::Acquire))
    }

    /// Replace the cadence, returning the previous one.
    pub(crate) fn replace(&self, cadence: RefreshCadence) -> RefreshCadence {
        let previous = self.interval_ms.swap(cadence.as_millis(), Ordering::AcqRel);
        RefreshCadence::clamped_from_ms(previous)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig::new(RefreshCadence::default())
    }
}

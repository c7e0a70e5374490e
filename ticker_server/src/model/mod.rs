//! Domain state of the quote server.
//!
//! This module groups the pieces that keep quotes fresh:
//! - `config` — the live refresh cadence shared by cache and scheduler.
//! - `cache` — `QuoteCache`, the last good quote set with single-flight refreshes.
//! - `scheduler` — `RefreshScheduler`, the re-armable background refresh timer.

pub mod cache;
pub mod config;
pub mod scheduler;

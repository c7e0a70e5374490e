//! Command-line arguments for the ticker client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ticker_common::Symbol;
use ticker_common::symbols::parse_symbol_list;

use crate::api::DEFAULT_SERVER_URL;
use crate::compositor::{DEFAULT_HEIGHT, DisplayMode};
use crate::error::Result;
use crate::scroll::DEFAULT_WIDTH;

/// Shortest accepted scroll step.
pub const MIN_SCROLL_MS: u64 = 10;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Scrolls quotes from a ticker server as a dot-matrix strip", long_about = None)]
pub struct Args {
    /// Base URL of the ticker server.
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Fetch these symbols directly instead of the server's cached set.
    /// Symbols may be separated by commas or spaces.
    #[arg(long)]
    pub symbols: Option<String>,

    /// Milliseconds between one-column scroll steps.
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(MIN_SCROLL_MS..))]
    pub scroll_ms: u64,

    /// Layout of the quote messages.
    #[arg(long, value_enum, default_value_t = DisplayMode::Single)]
    pub mode: DisplayMode,

    /// Matrix height in pixel rows (7 to 64).
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: usize,

    /// Visible window width in pixel columns.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: usize,

    /// Write log output to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Explicit symbols for ad-hoc mode, `None` for the server's cached set.
    pub fn ad_hoc_symbols(&self) -> Result<Option<Vec<Symbol>>> {
        match self.symbols.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Ok(Some(parse_symbol_list(raw)?)),
            _ => Ok(None),
        }
    }

    /// Time between scroll steps.
    pub fn scroll_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_ms)
    }
}

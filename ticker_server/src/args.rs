//! Command-line arguments for the ticker server.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ticker_common::net::DEFAULT_PORT;
use ticker_common::symbols::{DEFAULT_SYMBOLS, SymbolParser, parse_symbol_list};
use ticker_common::{QuoteError, RefreshCadence, Symbol};

use crate::error::{Result, ServerError};
use crate::provider::YAHOO_BASE_URL;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Serves cached stock quotes over HTTP", long_about = None)]
pub struct Args {
    /// Interface to bind the HTTP listener to.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// HTTP port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Symbols to keep cached, separated by commas or spaces.
    #[arg(long, default_value_t = DEFAULT_SYMBOLS.join(","))]
    pub symbols: String,

    /// Text file with symbols, one or more per line. Overrides `--symbols`.
    #[arg(long)]
    pub symbols_file: Option<PathBuf>,

    /// Refresh cadence in minutes (5 to 720).
    #[arg(long, default_value_t = 15.0)]
    pub refresh_minutes: f64,

    /// Base URL of the chart API.
    #[arg(long, default_value = YAHOO_BASE_URL)]
    pub provider_url: String,

    /// Timeout for each provider request, in seconds.
    #[arg(long, default_value_t = 10)]
    pub fetch_timeout_secs: u64,
}

impl Args {
    /// Symbols from `--symbols-file` if given, `--symbols` otherwise.
    pub fn resolve_symbols(&self) -> Result<Vec<Symbol>> {
        let symbols = match &self.symbols_file {
            Some(path) => {
                let file = File::open(path)?;
                Symbol::parse_from_file(BufReader::new(file))?
            }
            None => parse_symbol_list(&self.symbols)?,
        };
        if symbols.is_empty() {
            return Err(ServerError::Quote(QuoteError::NoSymbols));
        }
        Ok(symbols)
    }

    /// Validated initial cadence.
    pub fn cadence(&self) -> Result<RefreshCadence> {
        Ok(RefreshCadence::from_minutes(self.refresh_minutes)?)
    }

    /// Per-request provider timeout.
    pub fn fetch_timeout(&self) -> Result<Duration> {
        if self.fetch_timeout_secs == 0 {
            return Err(ServerError::Config(
                "--fetch-timeout-secs must be at least 1".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.fetch_timeout_secs))
    }
}

//! Ticker symbols and helpers shared between client and server.
//!
//! Symbols are free-form provider identifiers (`AAPL`, `BRK-B`, `^GSPC`, `EURUSD=X`), so they
//! are kept as normalized uppercase strings rather than a closed enum.

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QuoteError;

/// Symbols served when nothing else is configured.
pub const DEFAULT_SYMBOLS: &[&str] = &["AAPL", "MSFT", "GOOGL", "AMZN", "NVDA"];

/// Normalized (trimmed, uppercase) ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Borrow the symbol text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Symbol {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        let valid = !normalized.is_empty()
            && normalized.len() <= 32
            && normalized
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '_'));
        if valid {
            Ok(Symbol(normalized))
        } else {
            Err(QuoteError::InvalidSymbol(s.trim().to_string()))
        }
    }
}

impl TryFrom<String> for Symbol {
    type Error = QuoteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait providing file parsing for symbols.
pub trait SymbolParser: Sized {
    /// Parses symbols from a buffered reader.
    ///
    /// Each line may hold one or more symbols separated by commas or whitespace; blank lines
    /// are skipped. Returns an error if any entry cannot be parsed.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Self>, QuoteError>;
}

impl SymbolParser for Symbol {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Self>, QuoteError> {
        let mut symbols = Vec::new();

        for line_result in reader.lines() {
            let line = line_result.map_err(|e| QuoteError::SymbolsFile(e.to_string()))?;
            let trimmed_line = line.trim();
            if trimmed_line.is_empty() {
                continue;
            }

            match parse_symbol_list(trimmed_line) {
                Ok(parsed) => symbols.extend(parsed),
                Err(e) => return Err(QuoteError::SymbolsFile(e.to_string())),
            }
        }
        Ok(dedup(symbols))
    }
}

/// Parse a comma and/or whitespace separated symbol list, dropping duplicates while keeping
/// first-seen order.
pub fn parse_symbol_list(raw: &str) -> Result<Vec<Symbol>, QuoteError> {
    let symbols = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<Symbol>, _>>()?;
    Ok(dedup(symbols))
}

/// The built-in symbol set.
pub fn default_symbols() -> Vec<Symbol> {
    DEFAULT_SYMBOLS
        .iter()
        .map(|s| Symbol(s.to_string()))
        .collect()
}

fn dedup(symbols: Vec<Symbol>) -> Vec<Symbol> {
    let mut seen = std::collections::HashSet::new();
    symbols
        .into_iter()
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

//! Error types shared between client and server.
//!
//! `QuoteError` covers everything that can go wrong while obtaining quotes from the
//! upstream provider, plus rejected cadence input. It is `Clone` so one refresh outcome can
//! be handed to every caller waiting on the same in-flight refresh.
use thiserror::Error;

/// Unified quote/provider error shared by client and server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// The provider answered with a non-success HTTP status.
    #[error("HTTP error {status} when fetching '{symbol}'")]
    Status {
        /// Symbol that was requested.
        symbol: String,
        /// HTTP status code returned by the provider.
        status: u16,
    },

    /// The provider returned an error object in its payload.
    #[error("Data provider error for '{symbol}': {message}")]
    Provider {
        /// Symbol that was requested.
        symbol: String,
        /// Provider supplied error code or description.
        message: String,
    },

    /// The provider answered successfully but without any result for the symbol.
    #[error("No data returned for '{0}'")]
    EmptyResult(String),

    /// The provider could not be reached at all.
    #[error("Unable to reach data provider: {0}")]
    Transport(String),

    /// The payload could not be decoded.
    #[error("Received invalid JSON data: {0}")]
    Malformed(String),

    /// The refresh did not complete within the allotted time.
    #[error("Refresh timed out after {0} ms")]
    Timeout(u64),

    /// A refresh was requested with an empty symbol list.
    #[error("No symbols configured")]
    NoSymbols,

    /// A symbol contained characters no provider accepts.
    #[error("Invalid symbol: '{0}'")]
    InvalidSymbol(String),

    /// Error while reading or parsing a symbols file.
    #[error("Parse symbols file error: {0}")]
    SymbolsFile(String),

    /// Cadence input was non-numeric or outside the accepted bounds.
    #[error("Invalid refresh cadence: {0}")]
    Validation(String),
}

impl From<serde_json::Error> for QuoteError {
    fn from(err: serde_json::Error) -> Self {
        QuoteError::Malformed(err.to_string())
    }
}

impl QuoteError {
    /// `true` for input validation failures, `false` for provider failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, QuoteError::Validation(_))
    }
}

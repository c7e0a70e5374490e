//! Error types used across the ticker client crate.
//!
//! `ClientError` wraps everything the client can hit while talking to the server or
//! driving the terminal. `RenderError` is kept separate because it is raised while
//! validating display geometry, before any I/O happens.
use std::io;

use thiserror::Error;
use ticker_common::QuoteError;

/// Invalid display geometry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The reel height cannot hold a glyph or does not fit a 64-bit column.
    #[error("Display height {height} outside {min}..={max}")]
    Height {
        /// Requested height.
        height: usize,
        /// Smallest accepted height.
        min: usize,
        /// Largest accepted height.
        max: usize,
    },

    /// The visible window must be at least one column wide.
    #[error("Display width must be positive")]
    Width,
}

/// Unified error type for the client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Terminal or log file I/O.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server could not be reached or its reply could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server replied {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Error text from the `{ "error": ... }` body, or the raw body.
        message: String,
    },

    /// Invalid symbols, cadence or payload.
    #[error(transparent)]
    Quote(#[from] QuoteError),

    /// Invalid display geometry.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Convenient alias for `std::result::Result<T, ClientError>`.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

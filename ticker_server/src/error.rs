//! Error types used across the ticker server crate.
//!
//! `ServerError` covers startup and runtime failures of the binary (binding the listener,
//! reading the symbols file, building the provider client). Quote and validation failures
//! travel as `ticker_common::QuoteError` and are mapped to HTTP statuses in `routes`.
//!
//! Conversions:
//! - `std::io::Error` and `std::net::AddrParseError` convert via `From`, so `?` works in
//!   `main`.
//! - `QuoteError` converts via `From` for provider setup failures.
use std::io;
use std::net::AddrParseError;

use thiserror::Error;
use ticker_common::QuoteError;

/// Unified error type for server startup and I/O.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Wrapper for underlying `std::io::Error` values (listener bind, symbols file, signals).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The configured bind address is not a valid socket address.
    #[error("Invalid bind address: {0}")]
    Address(#[from] AddrParseError),

    /// Invalid configuration or provider setup.
    #[error("Quote error: {0}")]
    Quote(#[from] QuoteError),

    /// Configuration that parsed but cannot be used.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient alias for `std::result::Result<T, ServerError>` used by the binary.
pub type Result<T, E = ServerError> = std::result::Result<T, E>;

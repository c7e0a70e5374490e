//!
//! Common types and utilities shared by the ticker server and client.
//!
//! This crate aggregates:
//! - `error` — unified error type `QuoteError` used across the workspace.
//! - `result` — handy `Result<T, QuoteError>` alias.
//! - `quote` — the `Quote` record and the HTTP payloads built around it.
//! - `cadence` — refresh cadence bounds and validation.
//! - `symbols` — symbol normalization and list/file parsing.
//! - `net` — networking constants and small helpers.
#![warn(missing_docs)]
pub mod cadence;
pub mod error;
pub mod net;
pub mod quote;
pub mod result;
pub mod symbols;

pub use cadence::RefreshCadence;
pub use error::QuoteError;
pub use quote::{DataResponse, ErrorResponse, Quote, RefreshSettings};
pub use result::Result;
pub use symbols::Symbol;

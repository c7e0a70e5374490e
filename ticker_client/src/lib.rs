//! Dot-matrix quote ticker client.
//!
//! - `glyphs` — the fixed 5×7 font.
//! - `compositor` — `TextCompositor` turning text lines into a `Reel` of pixel columns.
//! - `scroll` — `ScrollRenderer`, stepping through a reel at a fixed real-time pace.
//! - `poller` — `ClientPoller`, the poll timer and the state built from server replies.
//! - `api`, `format`, `display`, `keys` — server calls, quote text, the terminal canvas and key
//!   bindings.
#![warn(missing_docs)]

pub mod api;
pub mod args;
pub mod compositor;
pub mod display;
pub mod error;
pub mod format;
pub mod glyphs;
pub mod keys;
pub mod poller;
pub mod scroll;

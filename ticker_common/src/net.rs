//! Shared networking constants and helpers used by client and server.

/// Default HTTP port of the quote server.
pub const DEFAULT_PORT: u16 = 3000;
/// Snapshot endpoint (`GET`).
pub const DATA_PATH: &str = "/api/data";
/// Cadence settings endpoint (`POST`).
pub const REFRESH_SETTINGS_PATH: &str = "/api/settings/refresh";

/// Join a base URL and an API path without doubling the slash.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

//! Quote and status text shown on the display.
use chrono::{DateTime, Local};
use ticker_common::Quote;

/// Placeholder for a missing price.
pub const MISSING_PRICE: &str = "N/A";

/// `SYMBOL PRICE CURRENCY`, followed by `+CHANGE +PCT%` when the change is known.
pub fn format_quote(quote: &Quote) -> String {
    let mut parts = vec![quote.symbol.clone()];
    match quote.price {
        Some(price) => parts.push(format!("{:.2}", price)),
        None => parts.push(MISSING_PRICE.to_string()),
    }
    if !quote.currency.trim().is_empty() {
        parts.push(quote.currency.trim().to_string());
    }
    if let (Some(change), Some(percent)) = (quote.change, quote.change_percent) {
        parts.push(format!("{:+.2}", change));
        parts.push(format!("{:+.2}%", percent));
    }
    parts.join(" ")
}

/// One message per quote, in order.
pub fn format_messages(quotes: &[Quote]) -> Vec<String> {
    quotes.iter().map(format_quote).collect()
}

/// Status line text for a snapshot taken at `updated_at` (epoch milliseconds, 0 = never).
pub fn format_updated(updated_at: u64) -> String {
    if updated_at == 0 {
        return "No data yet".to_string();
    }
    match i64::try_from(updated_at)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
    {
        Some(utc) => format!(
            "Updated {}",
            utc.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        None => format!("Updated at {} ms", updated_at),
    }
}

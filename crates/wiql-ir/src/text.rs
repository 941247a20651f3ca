//! Text helpers shared by fragment rendering

use chrono::{DateTime, Utc};

/// Timestamp literal profile: RFC 3339 in UTC with millisecond precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Single-quote `text`, doubling embedded quotes
pub fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Join the rendered form of each item with `separator`
pub fn concat<I, F>(items: I, selector: F, separator: &str) -> String
where
    I: IntoIterator,
    F: Fn(I::Item) -> String,
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(&selector(item));
    }
    out
}

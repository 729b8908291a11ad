use time::{macros::format_description, OffsetDateTime};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// `HH:mm:ss` wall-clock label for an instant, in UTC.
pub fn hms(ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .ok()
        .and_then(|at| at.format(format_description!("[hour]:[minute]:[second]")).ok())
        .unwrap_or_else(|| "00:00:00".to_owned())
}

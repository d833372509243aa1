use chrono::{DateTime, FixedOffset, Utc};

/// JST is UTC+9
const JST_OFFSET_SECONDS: i32 = 9 * 3600;

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current Unix timestamp as float seconds (microsecond precision).
pub fn now_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Format a millisecond Unix timestamp as RFC 3339 in JST.
///
/// Returns an empty string for timestamps chrono cannot represent.
pub fn millis_to_jst_rfc3339(millis: i64) -> String {
    let Some(utc) = DateTime::<Utc>::from_timestamp_millis(millis) else {
        return String::new();
    };
    match FixedOffset::east_opt(JST_OFFSET_SECONDS) {
        Some(jst) => utc.with_timezone(&jst).to_rfc3339(),
        None => utc.to_rfc3339(),
    }
}

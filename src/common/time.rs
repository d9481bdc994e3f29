use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current timestamp in seconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

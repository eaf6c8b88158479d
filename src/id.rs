//! ID and timestamp utilities for taggr
//!
//! Label records carry a unique id and a millisecond timestamp.

use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique label-record ID
///
/// Format: `{timestamp_ms}-{counter:04}`
/// Example: `1738300800123-0007`
pub fn generate_label_id() -> String {
    let timestamp = now_ms();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed) % 10_000;
    format!("{}-{:04}", timestamp, n)
}

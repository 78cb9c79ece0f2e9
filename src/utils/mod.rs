// src/utils/mod.rs

//! Utility functions and helpers.

pub mod http;
pub mod retry;

use chrono::{DateTime, Local};

pub use retry::{Backoff, RetryPolicy};

/// Filename-safe timestamp, e.g. `20260101_093000`.
pub fn file_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Sleep unless the delay is zero.
pub async fn pause(delay: std::time::Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_file_timestamp() {
        let at = Local.with_ymd_and_hms(2026, 1, 1, 9, 30, 0).unwrap();
        assert_eq!(file_timestamp(at), "20260101_093000");
    }
}

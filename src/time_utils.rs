// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for timestamps.

use chrono::{NaiveDateTime, Utc};

/// Current time as whole unix seconds (token expiry comparisons).
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Current time as fractional unix seconds (`last_updated` columns).
pub fn unix_now_f64() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Format a naive local timestamp for the export.
pub fn format_export_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

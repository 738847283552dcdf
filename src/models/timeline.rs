// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Manually logged life events read from the timeline spreadsheet.

use crate::error::{AppError, Result};
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// `Day` and `Time` columns are joined and parsed with this format.
const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M";

/// A derived timeline event (never persisted).
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub timestamp: NaiveDateTime,
    pub name: String,
    pub description: String,
}

impl TimelineEvent {
    /// Kind label used in the export.
    pub const KIND: &'static str = "event";

    /// Build an event from a spreadsheet row.
    ///
    /// Rows with an empty or missing `Event` column are not events and
    /// yield `Ok(None)`.
    pub fn from_row(row: &HashMap<String, String>) -> Result<Option<Self>> {
        let name = match row.get("Event").map(|s| s.trim()) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Ok(None),
        };

        let day = row.get("Day").map(String::as_str).unwrap_or_default();
        let time = row.get("Time").map(String::as_str).unwrap_or_default();
        let timestamp =
            NaiveDateTime::parse_from_str(&format!("{} {}", day.trim(), time.trim()), TIMESTAMP_FORMAT)
                .map_err(|e| {
                    AppError::MalformedRecord(format!(
                        "Event '{}' has invalid Day/Time '{} {}': {}",
                        name, day, time, e
                    ))
                })?;

        Ok(Some(Self {
            timestamp,
            name,
            description: row.get("description").cloned().unwrap_or_default(),
        }))
    }
}

/// Turn spreadsheet rows into timeline events, skipping non-event rows and
/// logging rows whose timestamp cannot be parsed.
pub fn events_from_rows<I>(rows: I) -> impl Iterator<Item = TimelineEvent>
where
    I: IntoIterator<Item = HashMap<String, String>>,
{
    rows.into_iter()
        .filter_map(|row| match TimelineEvent::from_row(&row) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping timeline row");
                None
            }
        })
}

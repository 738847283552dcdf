// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tabular export of cached activities and timeline events.

use crate::db::SqliteDb;
use crate::error::Result;
use crate::models::TimelineEvent;
use crate::time_utils::format_export_timestamp;
use chrono::{DateTime, NaiveDateTime};
use futures_util::TryStreamExt;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Activity fields carried into the export, in column order.
pub const SELECTED_FIELDS: &[&str] = &[
    "id",
    "name",
    "distance",
    "moving_time",
    "elapsed_time",
    "total_elevation_gain",
    "type",
    "start_date",
    "start_latlng",
    "average_speed",
    "average_temp",
    "average_cadence",
    "calories",
    "description",
    "average_heartrate",
    "max_heartrate",
    "suffer_score",
];

const PAINS_PREFIX: &str = "pains.";

/// One export row: ordered `(column, value)` pairs.
pub type ExportRow = Vec<(String, Value)>;

fn pain_line() -> &'static Regex {
    static PAIN_LINE: OnceLock<Regex> = OnceLock::new();
    // `.` does not cross newlines, so each line of the note is one candidate.
    PAIN_LINE.get_or_init(|| Regex::new(r"(.+):(.+)").expect("pain regex is valid"))
}

/// Parse `bodypart:number` lines of a private note into `pains.<bodypart>`
/// columns, one per body part in first-seen order. A body part mentioned
/// again takes the later value.
///
/// A note with any unparsable or non-finite number yields no pains at all.
pub fn parse_pains(private_note: &str) -> Vec<(String, f64)> {
    let mut pains: Vec<(String, f64)> = Vec::new();

    for caps in pain_line().captures_iter(private_note) {
        let column = format!("{}{}", PAINS_PREFIX, caps[1].to_lowercase());
        let value = caps[2].trim();
        let number = match value.parse::<f64>() {
            Ok(number) if number.is_finite() => number,
            Ok(_) => {
                tracing::error!(value, "Non-finite pain value, ignoring pain annotations");
                return Vec::new();
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    value,
                    "Exception during activities parsing, ignoring pain annotations"
                );
                return Vec::new();
            }
        };

        match pains.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = number,
            None => pains.push((column, number)),
        }
    }

    pains
}

/// Selected fields of a cached activity plus its pains columns.
pub fn activity_row(record: &Value) -> ExportRow {
    let empty = Map::new();
    let fields = record.as_object().unwrap_or(&empty);

    let mut row: ExportRow = SELECTED_FIELDS
        .iter()
        .filter_map(|&key| fields.get(key).map(|v| (key.to_string(), v.clone())))
        .collect();

    if let Some(note) = fields.get("private_note").and_then(Value::as_str) {
        row.extend(
            parse_pains(note)
                .into_iter()
                .map(|(column, value)| (column, Value::from(value))),
        );
    }

    row
}

/// Timeline event as an export row.
pub fn event_row(event: &TimelineEvent) -> ExportRow {
    vec![
        ("type".to_string(), Value::from(TimelineEvent::KIND)),
        (
            "timestamp".to_string(),
            Value::from(format_export_timestamp(event.timestamp)),
        ),
        ("name".to_string(), Value::from(event.name.clone())),
        ("description".to_string(), Value::from(event.description.clone())),
    ]
}

/// Export every cached activity of the user as CSV.
pub async fn activities_csv(db: &SqliteDb, user_id: &str) -> Result<String> {
    let mut rows = Vec::new();
    let mut activities = std::pin::pin!(db.get_activities(user_id));
    while let Some(cached) = activities.try_next().await? {
        rows.push(activity_row(&cached.raw));
    }
    tracing::info!(user_id, count = rows.len(), "Exporting cached activities");
    Ok(render_csv(&rows))
}

/// Export timeline events as CSV.
pub fn timeline_csv(events: impl IntoIterator<Item = TimelineEvent>) -> String {
    let rows: Vec<ExportRow> = events.into_iter().map(|e| event_row(&e)).collect();
    render_csv(&rows)
}

/// Export cached activities and timeline events as one CSV, ordered by time.
///
/// Activity rows keep their Strava `type`; event rows carry `type=event`.
pub async fn merged_csv(
    db: &SqliteDb,
    user_id: &str,
    events: impl IntoIterator<Item = TimelineEvent>,
) -> Result<String> {
    let mut records = Vec::new();
    let mut activities = std::pin::pin!(db.get_activities(user_id));
    while let Some(cached) = activities.try_next().await? {
        records.push(cached.raw);
    }

    let events: Vec<TimelineEvent> = events.into_iter().collect();
    tracing::info!(
        user_id,
        activities = records.len(),
        events = events.len(),
        "Exporting activities merged with timeline events"
    );
    Ok(render_csv(&merged_rows(&records, &events)))
}

/// Activity and event rows interleaved by start time.
///
/// Activities are placed by `start_date_local` (falling back to
/// `start_date`), events by their timestamp. Activities without a usable
/// start time go last; ties keep activities before events.
pub fn merged_rows(activities: &[Value], events: &[TimelineEvent]) -> Vec<ExportRow> {
    let mut keyed: Vec<(Option<NaiveDateTime>, ExportRow)> = activities
        .iter()
        .map(|record| (activity_start(record), activity_row(record)))
        .chain(events.iter().map(|e| (Some(e.timestamp), event_row(e))))
        .collect();

    keyed.sort_by_key(|(start, _)| (start.is_none(), *start));
    keyed.into_iter().map(|(_, row)| row).collect()
}

fn activity_start(record: &Value) -> Option<NaiveDateTime> {
    ["start_date_local", "start_date"]
        .iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .find_map(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|start| start.naive_local())
}

/// Render rows as CSV.
///
/// The header is the union of all columns in first-seen order; cells a row
/// lacks are left empty. No rows renders as an empty string.
pub fn render_csv(rows: &[ExportRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for (column, _) in row {
            if !columns.contains(&column.as_str()) {
                columns.push(column);
            }
        }
    }

    let mut out = String::new();
    push_record(&mut out, columns.iter().map(|c| escape_field(c)));

    for row in rows {
        push_record(
            &mut out,
            columns.iter().map(|column| {
                row.iter()
                    .find(|(c, _)| c.as_str() == *column)
                    .map(|(_, v)| escape_field(&cell_text(v)))
                    .unwrap_or_default()
            }),
        );
    }

    out
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>) {
    let record: Vec<String> = fields.collect();
    out.push_str(&record.join(","));
    out.push('\n');
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

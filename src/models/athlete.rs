//! Athlete profile snapshot.

use crate::error::{AppError, Result};
use serde_json::Value;

/// Athlete profile as upserted into the cache.
#[derive(Debug, Clone)]
pub struct AthleteRow {
    /// Strava athlete ID
    pub athlete_id: u64,
    pub user_id: String,
    pub last_updated: f64,
    pub raw: Value,
}

/// Read the athlete id out of a profile payload.
pub fn athlete_id(raw: &Value) -> Result<u64> {
    raw.get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| AppError::MalformedRecord("Athlete without numeric id".to_string()))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity model for the local cache.

use crate::error::{AppError, Result};
use serde_json::Value;

/// Columns extracted from a detailed Strava activity before insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRow {
    /// Strava activity ID
    pub id: u64,
    pub name: Option<String>,
    /// Activity type (Ride, Run, Hike, etc.)
    pub activity_type: Option<String>,
    pub private_note: Option<String>,
    pub description: Option<String>,
}

impl ActivityRow {
    /// Extract the stored columns; `id` is the only required field.
    pub fn from_raw(raw: &Value) -> Result<Self> {
        let id = raw
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| AppError::MalformedRecord("Activity without numeric id".to_string()))?;

        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            id,
            name: text("name"),
            activity_type: text("type"),
            private_note: text("private_note"),
            description: text("description"),
        })
    }
}

/// A cached activity as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedActivity {
    /// Full remote record
    pub raw: Value,
    /// When the row was written (unix seconds)
    pub last_updated: f64,
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token models.

use crate::error::{AppError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Token payload returned by the Strava token endpoint, on both code
/// exchange and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as a unix timestamp (seconds)
    pub expires_at: i64,
    /// Present on code exchange only
    #[serde(default)]
    pub athlete: Option<GrantAthlete>,
    /// Full payload as received, persisted alongside the extracted columns
    #[serde(skip)]
    pub raw: Value,
}

/// Athlete summary embedded in a code exchange response.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantAthlete {
    pub id: u64,
}

impl TokenGrant {
    /// Parse a grant from the raw JSON payload, keeping the payload.
    pub fn from_raw(raw: Value) -> Result<Self> {
        let mut grant: TokenGrant = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::MalformedRecord(format!("Token payload: {}", e)))?;
        grant.raw = raw;
        Ok(grant)
    }

    /// Whether the access token is past its expiry at `now` (unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// A stored token row: `(athlete_id, scope, payload)`.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub athlete_id: u64,
    pub scope: String,
    pub payload: TokenGrant,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_raw_keeps_payload() {
        let raw = json!({
            "token_type": "Bearer",
            "access_token": "a",
            "refresh_token": "r",
            "expires_at": 1700000000,
            "expires_in": 21600,
            "athlete": {"id": 42, "firstname": "Jo"}
        });
        let grant = TokenGrant::from_raw(raw.clone()).unwrap();
        assert_eq!(grant.athlete.unwrap().id, 42);
        assert_eq!(grant.raw, raw);
    }

    #[test]
    fn test_from_raw_rejects_missing_refresh_token() {
        let raw = json!({"access_token": "a", "expires_at": 1});
        let err = TokenGrant::from_raw(raw).unwrap_err();
        assert!(matches!(err, AppError::MalformedRecord(_)));
    }

    #[test]
    fn test_expiry_is_strict() {
        let grant = TokenGrant::from_raw(json!({
            "access_token": "a", "refresh_token": "r", "expires_at": 100
        }))
        .unwrap();
        assert!(!grant.is_expired_at(100));
        assert!(grant.is_expired_at(101));
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use strava_timeline::db::SqliteDb;
use strava_timeline::error::{AppError, Result};
use strava_timeline::models::TokenGrant;
use strava_timeline::services::{RedirectPrompt, StravaApi};

/// A call made against [`FakeStrava`].
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Exchange(String),
    Refresh(String),
    Athlete(String),
    List { page: u32, per_page: u32 },
    Detail(u64),
}

/// In-memory Strava stand-in that records every call.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeStrava {
    pub pages: Vec<Vec<Value>>,
    pub details: HashMap<u64, Value>,
    pub exchange_grant: Option<Value>,
    pub refresh_grant: Option<Value>,
    pub athlete: Value,
    pub fail_detail_for: Option<u64>,
    pub calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl FakeStrava {
    pub fn with_pages(pages: Vec<Vec<Value>>) -> Self {
        Self {
            pages,
            athlete: json!({"id": 42, "firstname": "Test", "lastname": "Athlete"}),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Detail(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl StravaApi for FakeStrava {
    fn request_access_url(
        &self,
        redirect_uri: &str,
        _approval_prompt: &str,
        scopes: &[&str],
        state: &str,
    ) -> String {
        format!(
            "https://strava.test/oauth/authorize?redirect_uri={}&scope={}&state={}",
            redirect_uri,
            scopes.join(","),
            state
        )
    }

    async fn exchange_token(&self, authorization_code: &str) -> Result<TokenGrant> {
        self.record(Call::Exchange(authorization_code.to_string()));
        match &self.exchange_grant {
            Some(raw) => TokenGrant::from_raw(raw.clone()),
            None => Err(AppError::RemoteRejected {
                status: 400,
                body: "bad code".to_string(),
            }),
        }
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant> {
        self.record(Call::Refresh(refresh_token.to_string()));
        match &self.refresh_grant {
            Some(raw) => TokenGrant::from_raw(raw.clone()),
            None => Err(AppError::RemoteRejected {
                status: 400,
                body: "invalid_grant".to_string(),
            }),
        }
    }

    async fn get_athlete_info(&self, access_token: &str) -> Result<Value> {
        self.record(Call::Athlete(access_token.to_string()));
        Ok(self.athlete.clone())
    }

    async fn list_activities(
        &self,
        _access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        self.record(Call::List { page, per_page });
        Ok(self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_activity_detailed(&self, _access_token: &str, activity_id: u64) -> Result<Value> {
        self.record(Call::Detail(activity_id));
        if self.fail_detail_for == Some(activity_id) {
            return Err(AppError::RemoteRejected {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(self.details.get(&activity_id).cloned().unwrap_or_else(|| {
            json!({
                "id": activity_id,
                "name": format!("Activity {}", activity_id),
                "type": "Run",
                "private_note": "knee:1",
            })
        }))
    }
}

/// Prompt that answers with a fixed redirect URL and counts invocations.
#[allow(dead_code)]
pub struct CountingPrompt {
    answer: String,
    calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl CountingPrompt {
    pub fn new(answer: &str) -> (Box<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let prompt = Self {
            answer: answer.to_string(),
            calls: calls.clone(),
        };
        (Box::new(prompt), calls)
    }
}

impl RedirectPrompt for CountingPrompt {
    fn read_redirect(&self, _authorize_url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

/// Strava-shaped token payload.
#[allow(dead_code)]
pub fn grant_json(access: &str, refresh: &str, expires_at: i64, athlete_id: Option<u64>) -> Value {
    let mut grant = json!({
        "token_type": "Bearer",
        "access_token": access,
        "refresh_token": refresh,
        "expires_at": expires_at,
        "expires_in": 21600,
    });
    if let Some(id) = athlete_id {
        grant["athlete"] = json!({"id": id, "firstname": "Test"});
    }
    grant
}

/// Activity summary as returned by the listing endpoint.
#[allow(dead_code)]
pub fn summary(id: u64) -> Value {
    json!({"id": id, "name": format!("Activity {}", id), "type": "Run"})
}

/// Create an in-memory test database.
#[allow(dead_code)]
pub async fn test_db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("Failed to create in-memory database")
}

/// Store a token for `user_id` that expires `expires_in` seconds from now.
#[allow(dead_code)]
pub async fn seed_token(db: &SqliteDb, user_id: &str, access: &str, refresh: &str, expires_in: i64) {
    let expires_at = chrono::Utc::now().timestamp() + expires_in;
    let grant = TokenGrant::from_raw(grant_json(access, refresh, expires_at, Some(42))).unwrap();
    db.store_token(user_id, 42, &grant, "read_all,activity:read_all")
        .await
        .expect("Failed to seed token");
}

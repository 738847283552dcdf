// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token lifecycle and activity cache synchronization.
//!
//! Handles the core workflow:
//! 1. Find a usable access token (authorize interactively or refresh if needed)
//! 2. Re-fetch and upsert the athlete profile
//! 3. Walk the paginated activity listing
//! 4. Fetch and cache full detail only for activities not cached yet

use crate::db::{SqliteDb, SyncSession};
use crate::error::{AppError, Result};
use crate::models::{TokenGrant, TokenRecord};
use crate::services::pager::{activity_id, ActivityPager};
use crate::services::prompt::RedirectPrompt;
use crate::services::strava::StravaApi;
use crate::time_utils::unix_now;
use url::Url;

/// Scopes requested during interactive authorization.
pub const DEFAULT_SCOPES: &[&str] = &["read_all", "activity:read_all"];

/// Where the stored access token stands relative to "now".
#[derive(Debug)]
pub enum TokenState {
    NoToken,
    Valid(TokenRecord),
    Expired(TokenRecord),
}

impl TokenState {
    /// Classify a looked-up token; expired means `now` is past `expires_at`.
    pub fn classify(record: Option<TokenRecord>, now: i64) -> Self {
        match record {
            None => TokenState::NoToken,
            Some(record) if record.payload.is_expired_at(now) => TokenState::Expired(record),
            Some(record) => TokenState::Valid(record),
        }
    }
}

/// Result of processing the authorization redirect.
#[derive(Debug)]
pub enum AuthorizationOutcome {
    /// Code exchanged; `scope` is the scope the user granted.
    Authorized { grant: TokenGrant, scope: String },
    /// The redirect did not carry a usable grant. No exchange was attempted.
    Denied(String),
    /// The code exchange itself failed.
    TransportError(AppError),
}

/// One newly cached activity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub id: u64,
    pub name: String,
}

/// Summary of a sync pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub athlete_id: u64,
    pub athlete: serde_json::Value,
    pub new_activities: Vec<NewActivity>,
    pub cached_activities: usize,
}

/// Drives token validation and the cache-miss activity pull.
pub struct SyncService<A> {
    api: A,
    db: SqliteDb,
    prompt: Box<dyn RedirectPrompt>,
    redirect_uri: String,
}

impl<A: StravaApi> SyncService<A> {
    pub fn new(
        api: A,
        db: SqliteDb,
        prompt: Box<dyn RedirectPrompt>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            api,
            db,
            prompt,
            redirect_uri: redirect_uri.into(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn db(&self) -> &SqliteDb {
        &self.db
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Get a non-expired access token for the user.
    ///
    /// - no token stored: interactive authorization
    /// - token expired: refresh with the stored refresh token
    /// - token valid: returned as is
    pub async fn valid_access_token(&self, user_id: &str) -> Result<TokenRecord> {
        let lookup = self.db.lookup_access_token(user_id).await?;

        match TokenState::classify(lookup, unix_now()) {
            TokenState::NoToken => {
                tracing::info!(user_id, "No access token found");
                self.acquire_token(user_id).await
            }
            TokenState::Expired(record) => {
                tracing::info!(
                    user_id,
                    expires_at = record.payload.expires_at,
                    "Access token expired"
                );
                self.refresh_token(user_id).await
            }
            TokenState::Valid(record) => {
                tracing::info!(
                    user_id,
                    athlete_id = record.athlete_id,
                    scope = %record.scope,
                    "Access token found"
                );
                Ok(record)
            }
        }
    }

    /// Interactive authorization: show the URL, read the redirect, exchange
    /// the code and store the tokens.
    pub async fn acquire_token(&self, user_id: &str) -> Result<TokenRecord> {
        let url = self
            .api
            .request_access_url(&self.redirect_uri, "auto", DEFAULT_SCOPES, user_id);
        let redirect_url = self.prompt.read_redirect(&url)?;

        let (grant, scope) = match self.handle_access_response(&redirect_url, user_id).await {
            AuthorizationOutcome::Authorized { grant, scope } => (grant, scope),
            AuthorizationOutcome::Denied(reason) => {
                tracing::error!(user_id, reason = %reason, "Authorization denied");
                return Err(AppError::NotAuthorized(reason));
            }
            AuthorizationOutcome::TransportError(e) => return Err(e),
        };

        let athlete_id = grant.athlete.as_ref().map(|a| a.id).ok_or_else(|| {
            AppError::MalformedRecord("Token exchange response without athlete".to_string())
        })?;

        self.db
            .store_token(user_id, athlete_id, &grant, &scope)
            .await?;
        self.stored_access_token(user_id).await
    }

    /// Parse the authorization redirect and exchange its code.
    ///
    /// An `error` parameter, a missing `code`, or a `state` that is not the
    /// local user id is a denial, and no exchange call is made.
    pub async fn handle_access_response(
        &self,
        redirect_url: &str,
        user_id: &str,
    ) -> AuthorizationOutcome {
        let url = match Url::parse(redirect_url) {
            Ok(url) => url,
            Err(e) => return AuthorizationOutcome::Denied(format!("Invalid redirect URL: {}", e)),
        };

        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        if let Some(error) = param("error") {
            tracing::error!(error = %error, "Received error in redirect URL");
            return AuthorizationOutcome::Denied(format!("Received {} in redirect URL", error));
        }

        match param("state") {
            Some(state) if state == user_id => {}
            other => {
                return AuthorizationOutcome::Denied(format!(
                    "State {:?} does not match user {}",
                    other, user_id
                ))
            }
        }

        let Some(code) = param("code") else {
            return AuthorizationOutcome::Denied("Redirect URL has no code".to_string());
        };
        let scope = param("scope").unwrap_or_else(|| DEFAULT_SCOPES.join(","));

        tracing::info!(user_id, scope = %scope, "Exchanging authorization code for tokens");
        match self.api.exchange_token(&code).await {
            Ok(grant) => AuthorizationOutcome::Authorized { grant, scope },
            Err(e) => AuthorizationOutcome::TransportError(e),
        }
    }

    /// Refresh with the latest stored refresh token and store the new tokens.
    pub async fn refresh_token(&self, user_id: &str) -> Result<TokenRecord> {
        tracing::info!(user_id, "Refreshing token");

        let stored = self
            .db
            .lookup_refresh_token(user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotAuthorized(format!("No refresh token stored for {}", user_id))
            })?;

        let grant = self
            .api
            .refresh_token(&stored.payload.refresh_token)
            .await?;

        self.db
            .store_token(user_id, stored.athlete_id, &grant, &stored.scope)
            .await?;
        self.stored_access_token(user_id).await
    }

    async fn stored_access_token(&self, user_id: &str) -> Result<TokenRecord> {
        self.db
            .lookup_access_token(user_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Token for {} not found after store", user_id))
            })
    }

    // ─── Activity Sync ───────────────────────────────────────────────────────

    /// Full sync pass for one user.
    ///
    /// Activity writes are batched in one [`SyncSession`]. If the pass fails
    /// midway, what was cached so far is still committed before the error is
    /// returned.
    pub async fn sync(&self, user_id: &str) -> Result<SyncReport> {
        let token = self.valid_access_token(user_id).await?;
        let access_token = token.payload.access_token.as_str();

        let athlete = self.api.get_athlete_info(access_token).await?;
        let athlete_id = self.db.store_athlete(&athlete, user_id).await?;

        let mut report = SyncReport {
            athlete_id,
            athlete,
            ..SyncReport::default()
        };

        let mut session = self.db.begin_session().await?;
        let outcome = self
            .pull_activities(&mut session, user_id, access_token, &mut report)
            .await;

        match outcome {
            Ok(()) => {
                session.commit().await?;
                tracing::info!(
                    user_id,
                    new = report.new_activities.len(),
                    cached = report.cached_activities,
                    "Sync complete"
                );
                Ok(report)
            }
            Err(e) => {
                let written = session.writes();
                if let Err(commit_err) = session.commit().await {
                    tracing::warn!(error = %commit_err, "Failed to commit partial sync");
                }
                tracing::error!(user_id, error = %e, written, "Sync aborted");
                Err(e)
            }
        }
    }

    async fn pull_activities(
        &self,
        session: &mut SyncSession,
        user_id: &str,
        access_token: &str,
        report: &mut SyncReport,
    ) -> Result<()> {
        let mut pager = ActivityPager::new(&self.api, access_token);

        while let Some(summary) = pager.next_activity().await? {
            let id = activity_id(&summary)?;
            let name = summary
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            if session.get_activity(id, user_id).await?.is_some() {
                tracing::debug!(activity_id = id, name = %name, "Activity found in cache");
                report.cached_activities += 1;
                continue;
            }

            tracing::info!(activity_id = id, name = %name, "Activity not found in cache");
            let detailed = self.api.get_activity_detailed(access_token, id).await?;
            session.store_activity(&detailed, user_id).await?;
            report.new_activities.push(NewActivity { id, name });
        }

        tracing::debug!(pages = pager.pages_requested(), "Activity listing exhausted");
        Ok(())
    }
}

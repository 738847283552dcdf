// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for OAuth and activity retrieval.
//!
//! Handles:
//! - Authorization URL construction and code exchange
//! - Token refresh
//! - Athlete profile and activity fetching
//!
//! Every non-2xx answer is returned as an error immediately; there is no
//! retry or backoff.

use crate::error::{AppError, Result};
use crate::models::TokenGrant;
use crate::services::pager::DetailedActivities;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

const STRAVA_API_URL: &str = "https://www.strava.com/api/v3";
const STRAVA_AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";

/// Remote operations the sync flow needs from Strava.
///
/// Implemented by [`StravaClient`]; tests substitute their own.
#[async_trait]
pub trait StravaApi: Send + Sync {
    /// Build the URL the user visits to authorize this app. No network call.
    fn request_access_url(
        &self,
        redirect_uri: &str,
        approval_prompt: &str,
        scopes: &[&str],
        state: &str,
    ) -> String;

    /// Exchange an authorization code for tokens.
    async fn exchange_token(&self, authorization_code: &str) -> Result<TokenGrant>;

    /// Renew a short-lived access token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant>;

    /// Get the authenticated athlete profile.
    async fn get_athlete_info(&self, access_token: &str) -> Result<Value>;

    /// One page of activity summaries (pages are 1-based).
    async fn list_activities(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>>;

    /// Get a detailed activity by ID.
    async fn get_activity_detailed(&self, access_token: &str, activity_id: u64) -> Result<Value>;
}

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    authorize_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: STRAVA_API_URL.to_string(),
            authorize_url: STRAVA_AUTHORIZE_URL.to_string(),
            client_id,
            client_secret,
        }
    }

    /// Point the API and token endpoints at another host (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Lazily iterate every activity in full detail (one listing request per
    /// page plus one detail request per activity).
    pub fn get_activities<'a>(&'a self, access_token: &'a str) -> DetailedActivities<'a, Self> {
        DetailedActivities::new(self, access_token)
    }

    fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url)
    }

    /// POST a token request and parse the grant.
    async fn post_token_form(&self, form: &[(&str, &str)], what: &str) -> Result<TokenGrant> {
        let url = self.token_url();
        tracing::info!(url = %url, "Requesting {}", what);

        let response = self
            .http
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::RemoteUnreachable(format!("{} failed: {}", what, e)))?;

        let raw: Value = check_response_json(response).await?;
        tracing::debug!(what, "Token response received");
        TokenGrant::from_raw(raw)
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::RemoteUnreachable(e.to_string()))?;

        check_response_json(response).await
    }
}

#[async_trait]
impl StravaApi for StravaClient {
    fn request_access_url(
        &self,
        redirect_uri: &str,
        approval_prompt: &str,
        scopes: &[&str],
        state: &str,
    ) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&approval_prompt={}&scope={}&state={}",
            self.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(approval_prompt),
            urlencoding::encode(&scopes.join(",")),
            urlencoding::encode(state),
        )
    }

    async fn exchange_token(&self, authorization_code: &str) -> Result<TokenGrant> {
        self.post_token_form(
            &[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", authorization_code),
                ("grant_type", "authorization_code"),
            ],
            "token exchange",
        )
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant> {
        self.post_token_form(
            &[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
            "token refresh",
        )
        .await
    }

    async fn get_athlete_info(&self, access_token: &str) -> Result<Value> {
        let url = format!("{}/athlete", self.base_url);
        self.get_json(&url, access_token, &[]).await
    }

    async fn list_activities(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        let url = format!("{}/athlete/activities", self.base_url);
        self.get_json(
            &url,
            access_token,
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    async fn get_activity_detailed(&self, access_token: &str, activity_id: u64) -> Result<Value> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);
        self.get_json(
            &url,
            access_token,
            &[("include_all_efforts", "false".to_string())],
        )
        .await
    }
}

/// Check response status and parse the JSON body.
pub(crate) async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            429 => tracing::warn!("Rate limit hit (429)"),
            401 => tracing::warn!("Access token rejected (401)"),
            _ => tracing::error!(status = %status, body = %body, "Remote request failed"),
        }

        return Err(AppError::RemoteRejected {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| AppError::RemoteUnreachable(format!("JSON parse error: {}", e)))
}

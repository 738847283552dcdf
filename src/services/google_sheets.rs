// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Sheets reader for the manually logged timeline.
//!
//! Credentials are kept in an authorized-user JSON file. When it is missing
//! or cannot be refreshed, the installed-app OAuth flow runs once on the
//! console and the file is rewritten.

use crate::error::{AppError, Result};
use crate::services::prompt::RedirectPrompt;
use crate::services::strava::check_response_json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Authorized-user credentials as persisted in the token file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl AuthorizedUser {
    /// Token present and not expired (no expiry means it does not expire).
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.token.is_some() && self.expiry.map_or(true, |expiry| now < expiry)
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Client-secrets file downloaded from the Google console.
#[derive(Debug, Deserialize)]
struct ClientSecrets {
    #[serde(alias = "web")]
    installed: InstalledApp,
}

#[derive(Debug, Deserialize)]
struct InstalledApp {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_auth_uri")]
    auth_uri: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

/// Google token endpoint response.
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// `spreadsheets.values.get` response.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Reads rows from a Google spreadsheet.
pub struct GoogleSheetClient {
    http: reqwest::Client,
    token_file: PathBuf,
    creds_file: PathBuf,
    sheets_url: String,
    prompt: Box<dyn RedirectPrompt>,
    creds: Option<AuthorizedUser>,
}

impl GoogleSheetClient {
    pub fn new(
        token_file: impl Into<PathBuf>,
        creds_file: impl Into<PathBuf>,
        prompt: Box<dyn RedirectPrompt>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_file: token_file.into(),
            creds_file: creds_file.into(),
            sheets_url: SHEETS_API_URL.to_string(),
            prompt,
            creds: None,
        }
    }

    /// Point the Sheets API at another host (tests).
    pub fn with_sheets_url(mut self, url: impl Into<String>) -> Self {
        self.sheets_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Load, refresh, or obtain credentials, then persist them.
    pub async fn authenticate(&mut self) -> Result<()> {
        let stored = if self.token_file.exists() {
            Some(read_json::<AuthorizedUser>(&self.token_file).await?)
        } else {
            None
        };

        let creds = match stored {
            Some(creds) if creds.is_valid_at(Utc::now()) => creds,
            Some(creds) if creds.refresh_token.is_some() => {
                let refreshed = self.refresh(creds).await?;
                write_json(&self.token_file, &refreshed).await?;
                refreshed
            }
            _ => {
                let fresh = self.run_installed_flow().await?;
                write_json(&self.token_file, &fresh).await?;
                fresh
            }
        };

        self.creds = Some(creds);
        tracing::info!("Google client authenticated successfully");
        Ok(())
    }

    async fn refresh(&self, mut creds: AuthorizedUser) -> Result<AuthorizedUser> {
        let refresh_token = creds.refresh_token.clone().unwrap_or_default();
        tracing::info!("Refreshing Google credentials");

        let response = self
            .http
            .post(&creds.token_uri)
            .form(&[
                ("client_id", creds.client_id.as_str()),
                ("client_secret", creds.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::RemoteUnreachable(format!("Google token refresh failed: {}", e)))?;

        let token: GoogleTokenResponse = check_response_json(response).await?;
        apply_token_response(&mut creds, token);
        Ok(creds)
    }

    async fn run_installed_flow(&self) -> Result<AuthorizedUser> {
        let secrets: ClientSecrets = read_json(&self.creds_file).await?;
        let app = secrets.installed;
        let redirect_uri = app
            .redirect_uris
            .first()
            .cloned()
            .unwrap_or_else(|| "http://localhost".to_string());

        let auth_url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&access_type=offline&prompt=consent",
            app.auth_uri,
            urlencoding::encode(&app.client_id),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(SHEETS_READONLY_SCOPE),
        );

        let redirect = self.prompt.read_redirect(&auth_url)?;
        let code = authorization_code(&redirect)?;

        let response = self
            .http
            .post(&app.token_uri)
            .form(&[
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
                ("code", code.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::RemoteUnreachable(format!("Google code exchange failed: {}", e)))?;

        let token: GoogleTokenResponse = check_response_json(response).await?;
        let mut creds = AuthorizedUser {
            token: None,
            refresh_token: None,
            token_uri: app.token_uri,
            client_id: app.client_id,
            client_secret: app.client_secret,
            scopes: vec![SHEETS_READONLY_SCOPE.to_string()],
            expiry: None,
        };
        apply_token_response(&mut creds, token);
        Ok(creds)
    }

    /// Read a range; the first row is the header and every following row is
    /// returned as a map keyed by header.
    ///
    /// Rows shorter than the header only carry the columns they have, and
    /// cells beyond the header are dropped.
    pub async fn read_from_sheet(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<impl Iterator<Item = HashMap<String, String>>> {
        let token = self
            .creds
            .as_ref()
            .and_then(|c| c.token.as_deref())
            .ok_or_else(|| AppError::NotAuthorized("Google client not authenticated".to_string()))?;

        tracing::info!(spreadsheet_id, range, "Retrieving rows from spreadsheet");
        let url = format!(
            "{}/spreadsheets/{}/values/{}",
            self.sheets_url,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range),
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::RemoteUnreachable(e.to_string()))?;
        let body: ValueRange = check_response_json(response).await?;

        let mut values = body.values.into_iter();
        let header = values.next().unwrap_or_default();
        tracing::info!(header = ?header, "Sheet header (1st row)");

        Ok(values.map(move |row| {
            header
                .iter()
                .cloned()
                .zip(row)
                .collect::<HashMap<String, String>>()
        }))
    }
}

fn apply_token_response(creds: &mut AuthorizedUser, token: GoogleTokenResponse) {
    creds.token = Some(token.access_token);
    creds.expiry = token
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs));
    if let Some(refresh_token) = token.refresh_token {
        creds.refresh_token = Some(refresh_token);
    }
}

/// Pull the `code` out of a redirect URL; a bare code is accepted as is.
fn authorization_code(redirect: &str) -> Result<String> {
    let Ok(url) = Url::parse(redirect) else {
        return Ok(redirect.to_string());
    };
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => return Ok(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }
    Err(AppError::NotAuthorized(format!(
        "Google authorization failed: {}",
        error.unwrap_or_else(|| "no code in redirect URL".to_string())
    )))
}

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&text)
        .map_err(|e| AppError::MalformedRecord(format!("{}: {}", path.display(), e)))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, text).await?;
    Ok(())
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local use.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Strava OAuth client ID (needed for `--update` only)
    pub strava_client_id: Option<String>,
    /// Strava OAuth client secret (needed for `--update` only)
    pub strava_client_secret: Option<String>,
    /// Redirect URI registered with the Strava application
    pub strava_redirect_uri: String,
    /// SQLite cache file
    pub storage_db: PathBuf,
    /// Optional schema script; the bundled schema is used when unset
    pub storage_schema_file: Option<PathBuf>,
    /// Local account used when `--id` is not given
    pub default_account_id: Option<String>,

    // --- Google Sheets (timeline events) ---
    pub google_token_file: PathBuf,
    pub google_creds_file: PathBuf,
    pub google_spreadsheet_id: Option<String>,
    pub google_sheet_range: String,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            strava_client_id: Some("test_client_id".to_string()),
            strava_client_secret: Some("test_secret".to_string()),
            strava_redirect_uri: "https://localhost".to_string(),
            storage_db: PathBuf::from("strava.db"),
            storage_schema_file: None,
            default_account_id: Some("me".to_string()),
            google_token_file: PathBuf::from("google_token.json"),
            google_creds_file: PathBuf::from("google_credentials.json"),
            google_spreadsheet_id: None,
            google_sheet_range: "Blad1".to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            strava_client_id: non_empty_var("STRAVA_CLIENT_ID"),
            strava_client_secret: non_empty_var("STRAVA_CLIENT_SECRET"),
            strava_redirect_uri: env::var("STRAVA_REDIRECT_URI")
                .unwrap_or_else(|_| "https://localhost".to_string()),
            storage_db: env::var("STORAGE_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("strava.db")),
            storage_schema_file: non_empty_var("STORAGE_SCHEMA_FILE").map(PathBuf::from),
            default_account_id: non_empty_var("DEFAULT_ACCOUNT_ID"),
            google_token_file: env::var("GOOGLE_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("google_token.json")),
            google_creds_file: env::var("GOOGLE_CREDS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("google_credentials.json")),
            google_spreadsheet_id: non_empty_var("GOOGLE_SPREADSHEET_ID"),
            google_sheet_range: env::var("GOOGLE_SHEET_RANGE")
                .unwrap_or_else(|_| "Blad1".to_string()),
        })
    }

    /// Strava client id and secret, required only when syncing.
    pub fn strava_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let id = self
            .strava_client_id
            .as_deref()
            .ok_or(ConfigError::Missing("STRAVA_CLIENT_ID"))?;
        let secret = self
            .strava_client_secret
            .as_deref()
            .ok_or(ConfigError::Missing("STRAVA_CLIENT_SECRET"))?;
        Ok((id, secret))
    }

    /// Local account id: the command-line value, else `DEFAULT_ACCOUNT_ID`.
    pub fn account_id(&self, from_cli: Option<String>) -> Result<String, ConfigError> {
        from_cli
            .or_else(|| self.default_account_id.clone())
            .ok_or(ConfigError::Missing("DEFAULT_ACCOUNT_ID"))
    }

    /// Spreadsheet id, required only when timeline events are requested.
    pub fn spreadsheet_id(&self) -> Result<&str, ConfigError> {
        self.google_spreadsheet_id
            .as_deref()
            .ok_or(ConfigError::Missing("GOOGLE_SPREADSHEET_ID"))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("STRAVA_CLIENT_ID", "test_id");
        env::set_var("STRAVA_CLIENT_SECRET", " test_secret\n");
        env::set_var("STORAGE_DB", "/tmp/cache.db");
        env::remove_var("GOOGLE_SHEET_RANGE");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.strava_credentials().unwrap(), ("test_id", "test_secret"));
        assert_eq!(config.storage_db, PathBuf::from("/tmp/cache.db"));
        assert_eq!(config.google_sheet_range, "Blad1");
    }

    #[test]
    fn test_spreadsheet_id_required_when_missing() {
        let config = Config::test_default();
        assert!(matches!(
            config.spreadsheet_id(),
            Err(ConfigError::Missing("GOOGLE_SPREADSHEET_ID"))
        ));
    }

    #[test]
    fn test_strava_credentials_required_only_on_use() {
        let mut config = Config::test_default();
        config.strava_client_secret = None;
        assert!(matches!(
            config.strava_credentials(),
            Err(ConfigError::Missing("STRAVA_CLIENT_SECRET"))
        ));

        config.strava_client_id = None;
        assert!(matches!(
            config.strava_credentials(),
            Err(ConfigError::Missing("STRAVA_CLIENT_ID"))
        ));
    }

    #[test]
    fn test_account_id_resolution() {
        let mut config = Config::test_default();
        assert_eq!(config.account_id(Some("cli".to_string())).unwrap(), "cli");
        assert_eq!(config.account_id(None).unwrap(), "me");

        config.default_account_id = None;
        assert!(matches!(
            config.account_id(None),
            Err(ConfigError::Missing("DEFAULT_ACCOUNT_ID"))
        ));
    }
}

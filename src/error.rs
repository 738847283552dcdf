// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.

use crate::config::ConfigError;

/// Application error type shared by storage, remote clients and the sync flow.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A remote service answered with a non-success status.
    #[error("Remote rejected request: HTTP {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    /// The remote service could not be reached or its answer could not be read.
    #[error("Remote unreachable: {0}")]
    RemoteUnreachable(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True when the remote rejected our bearer token (HTTP 401).
    pub fn is_token_error(&self) -> bool {
        matches!(self, AppError::RemoteRejected { status: 401, .. })
    }

    /// True when the remote answered with HTTP 429.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::RemoteRejected { status: 429, .. })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::RemoteUnreachable(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedRecord(err.to_string())
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;

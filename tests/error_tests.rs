// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use strava_timeline::config::ConfigError;
use strava_timeline::error::AppError;

#[test]
fn test_is_token_error_matches() {
    let err = AppError::RemoteRejected {
        status: 401,
        body: "Authorization Error".to_string(),
    };
    assert!(err.is_token_error());
}

#[test]
fn test_is_token_error_no_match() {
    let err = AppError::RemoteRejected {
        status: 429,
        body: "Rate Limit Exceeded".to_string(),
    };
    assert!(!err.is_token_error());
    assert!(err.is_rate_limited());

    let err = AppError::RemoteUnreachable("connection refused".to_string());
    assert!(!err.is_token_error());

    let err = AppError::NotAuthorized("access_denied".to_string());
    assert!(!err.is_token_error());
}

#[test]
fn test_error_messages() {
    let err = AppError::RemoteRejected {
        status: 500,
        body: "oops".to_string(),
    };
    assert_eq!(err.to_string(), "Remote rejected request: HTTP 500: oops");

    let err = AppError::from(ConfigError::Missing("STRAVA_CLIENT_ID"));
    assert!(err.to_string().contains("STRAVA_CLIENT_ID"));
}

#[test]
fn test_json_error_is_malformed_record() {
    let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    assert!(matches!(AppError::from(parse), AppError::MalformedRecord(_)));
}

#[test]
fn test_internal_error_wraps_anyhow() {
    let err = AppError::from(anyhow::anyhow!("Input closed"));
    assert!(matches!(err, AppError::Internal(_)));
    assert_eq!(err.to_string(), "Internal error: Input closed");
}

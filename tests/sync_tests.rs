// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync orchestration against an in-memory Strava.

mod common;

use common::{grant_json, seed_token, summary, test_db, Call, CountingPrompt, FakeStrava};
use std::sync::atomic::Ordering;
use strava_timeline::error::AppError;
use strava_timeline::services::{AuthorizationOutcome, FixedPrompt, SyncService};

const USER: &str = "me";

fn service(api: FakeStrava, db: strava_timeline::db::SqliteDb) -> SyncService<FakeStrava> {
    SyncService::new(
        api,
        db,
        Box::new(FixedPrompt("unused".to_string())),
        "https://localhost",
    )
}

#[tokio::test]
async fn test_cached_activities_are_not_refetched() {
    let db = test_db().await;
    seed_token(&db, USER, "a", "r", 3600).await;
    db.store_activity(&serde_json::json!({"id": 2, "name": "Old"}), USER)
        .await
        .unwrap();

    let api = FakeStrava::with_pages(vec![vec![summary(1), summary(2)], vec![summary(3)]]);
    let sync = service(api, db);

    let report = sync.sync(USER).await.unwrap();

    assert_eq!(sync.api().detail_calls(), vec![1, 3]);
    assert_eq!(report.cached_activities, 1);
    let new_ids: Vec<u64> = report.new_activities.iter().map(|a| a.id).collect();
    assert_eq!(new_ids, vec![1, 3]);

    // The cached record itself is left alone.
    let cached = sync.db().get_activity(2, USER).await.unwrap().unwrap();
    assert_eq!(cached.raw["name"], "Old");
}

#[tokio::test]
async fn test_second_sync_fetches_nothing_new() {
    let db = test_db().await;
    seed_token(&db, USER, "a", "r", 3600).await;

    let api = FakeStrava::with_pages(vec![vec![summary(1), summary(2)]]);
    let sync = service(api, db);

    sync.sync(USER).await.unwrap();
    let report = sync.sync(USER).await.unwrap();

    assert!(report.new_activities.is_empty());
    assert_eq!(report.cached_activities, 2);
    assert_eq!(sync.api().detail_calls(), vec![1, 2]);
}

#[tokio::test]
async fn test_listing_stops_at_first_empty_page() {
    let db = test_db().await;
    seed_token(&db, USER, "a", "r", 3600).await;

    let api = FakeStrava::with_pages(vec![vec![summary(1), summary(2)], vec![summary(3)]]);
    let sync = service(api, db);
    sync.sync(USER).await.unwrap();

    let pages: Vec<u32> = sync
        .api()
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::List { page, per_page } => {
                assert_eq!(per_page, 50);
                Some(page)
            }
            _ => None,
        })
        .collect();
    assert_eq!(pages, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_valid_token_is_used_as_is() {
    let db = test_db().await;
    seed_token(&db, USER, "current", "r", 3600).await;

    let (prompt, prompts) = CountingPrompt::new("https://localhost/?state=me&code=x");
    let sync = SyncService::new(FakeStrava::with_pages(vec![]), db, prompt, "https://localhost");

    let token = sync.valid_access_token(USER).await.unwrap();

    assert_eq!(token.payload.access_token, "current");
    assert_eq!(prompts.load(Ordering::SeqCst), 0);
    assert!(sync.api().calls().is_empty());
}

#[tokio::test]
async fn test_no_token_runs_interactive_authorization() {
    let db = test_db().await;
    let mut api = FakeStrava::with_pages(vec![]);
    let expires_at = chrono::Utc::now().timestamp() + 3600;
    api.exchange_grant = Some(grant_json("fresh", "fresh-r", expires_at, Some(42)));

    let (prompt, prompts) = CountingPrompt::new(
        "https://localhost/?state=me&code=abc&scope=read,activity:read_all",
    );
    let sync = SyncService::new(api, db, prompt, "https://localhost");

    let token = sync.valid_access_token(USER).await.unwrap();

    assert_eq!(prompts.load(Ordering::SeqCst), 1);
    assert_eq!(sync.api().calls(), vec![Call::Exchange("abc".to_string())]);
    assert_eq!(token.payload.access_token, "fresh");
    assert_eq!(token.athlete_id, 42);
    assert_eq!(token.scope, "read,activity:read_all");

    let refresh = sync.db().lookup_refresh_token(USER).await.unwrap().unwrap();
    assert_eq!(refresh.payload.refresh_token, "fresh-r");
}

#[tokio::test]
async fn test_expired_token_is_refreshed_without_prompt() {
    let db = test_db().await;
    seed_token(&db, USER, "old", "old-r", -60).await;

    let mut api = FakeStrava::with_pages(vec![]);
    let expires_at = chrono::Utc::now().timestamp() + 3600;
    api.refresh_grant = Some(grant_json("new", "new-r", expires_at, None));

    let (prompt, prompts) = CountingPrompt::new("https://localhost/?state=me&code=x");
    let sync = SyncService::new(api, db, prompt, "https://localhost");

    let token = sync.valid_access_token(USER).await.unwrap();

    assert_eq!(prompts.load(Ordering::SeqCst), 0);
    assert_eq!(sync.api().calls(), vec![Call::Refresh("old-r".to_string())]);
    assert_eq!(token.payload.access_token, "new");
    // Athlete and scope carry over from the stored token.
    assert_eq!(token.athlete_id, 42);
    assert_eq!(token.scope, "read_all,activity:read_all");
}

#[tokio::test]
async fn test_denied_authorization_makes_no_exchange() {
    let db = test_db().await;
    let (prompt, _) = CountingPrompt::new("https://localhost/?state=me&error=access_denied");
    let sync = SyncService::new(FakeStrava::with_pages(vec![]), db, prompt, "https://localhost");

    let err = sync.sync(USER).await.unwrap_err();

    assert!(matches!(err, AppError::NotAuthorized(msg) if msg.contains("access_denied")));
    assert_eq!(sync.api().count(|c| matches!(c, Call::Exchange(_))), 0);
    assert!(sync.db().lookup_access_token(USER).await.unwrap().is_none());
}

#[tokio::test]
async fn test_state_mismatch_is_denied() {
    let db = test_db().await;
    let sync = service(FakeStrava::with_pages(vec![]), db);

    let outcome = sync
        .handle_access_response("https://localhost/?state=someone-else&code=abc", USER)
        .await;
    assert!(matches!(outcome, AuthorizationOutcome::Denied(_)));

    let outcome = sync
        .handle_access_response("https://localhost/?code=abc", USER)
        .await;
    assert!(matches!(outcome, AuthorizationOutcome::Denied(_)));

    assert!(sync.api().calls().is_empty());
}

#[tokio::test]
async fn test_failed_exchange_is_transport_error() {
    let db = test_db().await;
    let sync = service(FakeStrava::with_pages(vec![]), db);

    let outcome = sync
        .handle_access_response("https://localhost/?state=me&code=abc", USER)
        .await;

    assert!(matches!(
        outcome,
        AuthorizationOutcome::TransportError(AppError::RemoteRejected { status: 400, .. })
    ));
}

#[tokio::test]
async fn test_refresh_without_stored_token_is_not_authorized() {
    let db = test_db().await;
    let sync = service(FakeStrava::with_pages(vec![]), db);

    let err = sync.refresh_token(USER).await.unwrap_err();
    assert!(matches!(err, AppError::NotAuthorized(_)));
    assert!(sync.api().calls().is_empty());
}

#[tokio::test]
async fn test_failure_midway_keeps_earlier_activities() {
    let db = test_db().await;
    seed_token(&db, USER, "a", "r", 3600).await;

    let mut api = FakeStrava::with_pages(vec![vec![summary(1), summary(2), summary(3)]]);
    api.fail_detail_for = Some(3);
    let sync = service(api, db);

    let err = sync.sync(USER).await.unwrap_err();
    assert!(matches!(err, AppError::RemoteRejected { status: 500, .. }));

    assert!(sync.db().get_activity(1, USER).await.unwrap().is_some());
    assert!(sync.db().get_activity(2, USER).await.unwrap().is_some());
    assert!(sync.db().get_activity(3, USER).await.unwrap().is_none());
}

#[tokio::test]
async fn test_athlete_is_upserted_each_sync() {
    let db = test_db().await;
    seed_token(&db, USER, "a", "r", 3600).await;

    let mut api = FakeStrava::with_pages(vec![]);
    api.athlete = serde_json::json!({"id": 42, "firstname": "Before"});
    let sync = service(api, db);
    let report = sync.sync(USER).await.unwrap();
    assert_eq!(report.athlete_id, 42);

    let db = sync.db().clone();
    let mut api = FakeStrava::with_pages(vec![]);
    api.athlete = serde_json::json!({"id": 42, "firstname": "After"});
    let sync = service(api, db);
    sync.sync(USER).await.unwrap();

    let athlete = sync.db().get_athlete(42).await.unwrap().unwrap();
    assert_eq!(athlete.raw["firstname"], "After");
    assert_eq!(athlete.user_id, USER);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM athletes")
        .fetch_one(sync.db().pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

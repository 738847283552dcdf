// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Tokens (one row per issuance, latest row wins on lookup)
//! - Activities (write-once cache keyed by activity id and user id)
//! - Athletes (profile snapshots, upserted)

use crate::db::session::SyncSession;
use crate::db::BUNDLED_SCHEMA;
use crate::error::{AppError, Result};
use crate::models::athlete::{athlete_id, AthleteRow};
use crate::models::{ActivityRow, CachedActivity, TokenGrant, TokenRecord};
use crate::time_utils::unix_now_f64;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::path::Path;
use std::str::FromStr;

/// SQLite database client.
///
/// The pool holds a single connection: the tool is single-user and
/// single-process, and a [`SyncSession`] keeps that connection for the
/// length of a batch.
#[derive(Clone)]
pub struct SqliteDb {
    pool: SqlitePool,
}

impl SqliteDb {
    /// Open the database file, creating it if needed, and apply the schema
    /// script when the cache tables are not there yet.
    ///
    /// `schema_file` overrides the bundled schema. The script runs in one
    /// transaction, so a failed initialization leaves no partial schema.
    pub async fn open(db_file: &Path, schema_file: Option<&Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_file)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to open {}: {}", db_file.display(), e))
            })?;

        let db = Self { pool };

        if !db.has_schema().await? {
            tracing::info!(path = %db_file.display(), "Database not initialized, applying schema");
            let applied = match schema_file {
                Some(path) => match tokio::fs::read_to_string(path).await {
                    Ok(script) => db.apply_schema(&script).await,
                    Err(e) => Err(e.into()),
                },
                None => db.apply_schema(BUNDLED_SCHEMA).await,
            };
            if let Err(e) = applied {
                tracing::error!(path = %db_file.display(), error = %e, "Schema initialization failed");
                db.pool.close().await;
                return Err(e);
            }
        }

        tracing::debug!(path = %db_file.display(), "Opened SQLite cache");
        Ok(db)
    }

    /// Create an in-memory database with the bundled schema (tests).
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // The in-memory database lives only as long as its one connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.apply_schema(BUNDLED_SCHEMA).await?;
        Ok(db)
    }

    async fn has_schema(&self) -> Result<bool> {
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'activities'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(tables > 0)
    }

    async fn apply_schema(&self, script: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if let Err(e) = sqlx::raw_sql(script).execute(&mut *tx).await {
            tx.rollback().await?;
            return Err(e.into());
        }
        tx.commit().await?;
        tracing::info!("Database initialized");
        Ok(())
    }

    /// Get a reference to the pool for ad-hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a batched write scope.
    ///
    /// The session owns the only pooled connection until it is committed or
    /// dropped, so no other `SqliteDb` call may be awaited in between.
    pub async fn begin_session(&self) -> Result<SyncSession> {
        let tx = self.pool.begin().await?;
        tracing::debug!("Sync session started");
        Ok(SyncSession::new(tx))
    }

    // ─── Token Operations ────────────────────────────────────────

    /// Append a new access token row and a new refresh token row.
    ///
    /// Nothing is replaced: each issuance adds rows, and lookups return the
    /// latest one.
    pub async fn store_token(
        &self,
        user_id: &str,
        athlete_id: u64,
        grant: &TokenGrant,
        scope: &str,
    ) -> Result<()> {
        let raw = grant.raw.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, athlete_id, token, scope, raw) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(athlete_id as i64)
        .bind(grant.refresh_token.as_str())
        .bind(scope)
        .bind(raw.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO access_tokens (user_id, athlete_id, expires_at, token, scope, raw) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(athlete_id as i64)
        .bind(grant.expires_at)
        .bind(grant.access_token.as_str())
        .bind(scope)
        .bind(raw.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id, athlete_id, expires_at = grant.expires_at, "New tokens stored");
        Ok(())
    }

    /// Latest access token issued for the user, if any.
    pub async fn lookup_access_token(&self, user_id: &str) -> Result<Option<TokenRecord>> {
        let row = sqlx::query(
            "SELECT athlete_id, scope, raw FROM access_tokens \
             WHERE user_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(token_record_from_row).transpose()
    }

    /// Latest refresh token issued for the user, if any.
    pub async fn lookup_refresh_token(&self, user_id: &str) -> Result<Option<TokenRecord>> {
        let row = sqlx::query(
            "SELECT athlete_id, scope, raw FROM refresh_tokens \
             WHERE user_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(token_record_from_row).transpose()
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Insert a detailed activity. Returns the activity id.
    pub async fn store_activity(&self, activity: &Value, user_id: &str) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        insert_activity(&mut conn, activity, user_id).await
    }

    /// Point lookup used as the cache-miss test.
    pub async fn get_activity(
        &self,
        activity_id: u64,
        user_id: &str,
    ) -> Result<Option<CachedActivity>> {
        let mut conn = self.pool.acquire().await?;
        select_activity(&mut conn, activity_id, user_id).await
    }

    /// Lazily stream every cached activity of the user, in insertion order.
    pub fn get_activities<'a>(
        &'a self,
        user_id: &'a str,
    ) -> impl Stream<Item = Result<CachedActivity>> + 'a {
        sqlx::query("SELECT raw, last_updated FROM activities WHERE user_id = ? ORDER BY rowid")
            .bind(user_id)
            .fetch(&self.pool)
            .map(|row| row.map_err(AppError::from).and_then(|r| cached_from_row(&r)))
    }

    // ─── Athlete Operations ──────────────────────────────────────

    /// Create or overwrite the athlete snapshot. Returns the athlete id.
    pub async fn store_athlete(&self, athlete: &Value, user_id: &str) -> Result<u64> {
        let id = athlete_id(athlete)?;

        let result = sqlx::query(
            "INSERT INTO athletes (athlete_id, user_id, last_updated, raw) VALUES (?, ?, ?, ?) \
             ON CONFLICT(athlete_id) DO UPDATE SET \
                user_id = excluded.user_id, \
                last_updated = excluded.last_updated, \
                raw = excluded.raw",
        )
        .bind(id as i64)
        .bind(user_id)
        .bind(unix_now_f64())
        .bind(athlete.to_string())
        .execute(&self.pool)
        .await?;

        tracing::info!(
            athlete_id = id,
            row = result.last_insert_rowid(),
            "Athlete inserted/updated"
        );
        Ok(id)
    }

    /// Get the stored athlete snapshot.
    pub async fn get_athlete(&self, athlete_id: u64) -> Result<Option<AthleteRow>> {
        let row = sqlx::query(
            "SELECT athlete_id, user_id, last_updated, raw FROM athletes WHERE athlete_id = ?",
        )
        .bind(athlete_id as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<AthleteRow> {
            Ok(AthleteRow {
                athlete_id: row.try_get::<i64, _>("athlete_id")? as u64,
                user_id: row.try_get("user_id")?,
                last_updated: row.try_get("last_updated")?,
                raw: serde_json::from_str(row.try_get::<&str, _>("raw")?)?,
            })
        })
        .transpose()
    }
}

// ─── Connection-level helpers (shared with SyncSession) ──────────

pub(crate) async fn insert_activity(
    conn: &mut SqliteConnection,
    activity: &Value,
    user_id: &str,
) -> Result<u64> {
    let row = ActivityRow::from_raw(activity)?;

    sqlx::query(
        "INSERT INTO activities \
         (id, private_note, description, name, type, user_id, last_updated, raw) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(row.id as i64)
    .bind(row.private_note.as_deref())
    .bind(row.description.as_deref())
    .bind(row.name.as_deref())
    .bind(row.activity_type.as_deref())
    .bind(user_id)
    .bind(unix_now_f64())
    .bind(activity.to_string())
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        activity_id = row.id,
        name = row.name.as_deref().unwrap_or_default(),
        "Activity inserted"
    );
    Ok(row.id)
}

pub(crate) async fn select_activity(
    conn: &mut SqliteConnection,
    activity_id: u64,
    user_id: &str,
) -> Result<Option<CachedActivity>> {
    let row = sqlx::query("SELECT raw, last_updated FROM activities WHERE id = ? AND user_id = ?")
        .bind(activity_id as i64)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(cached_from_row).transpose()
}

fn cached_from_row(row: &SqliteRow) -> Result<CachedActivity> {
    Ok(CachedActivity {
        raw: serde_json::from_str(row.try_get::<&str, _>("raw")?)?,
        last_updated: row.try_get("last_updated")?,
    })
}

fn token_record_from_row(row: &SqliteRow) -> Result<TokenRecord> {
    let raw: Value = serde_json::from_str(row.try_get::<&str, _>("raw")?)?;
    Ok(TokenRecord {
        athlete_id: row.try_get::<i64, _>("athlete_id")? as u64,
        scope: row.try_get::<Option<String>, _>("scope")?.unwrap_or_default(),
        payload: TokenGrant::from_raw(raw)?,
    })
}

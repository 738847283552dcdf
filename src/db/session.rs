// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transaction scope for batched cache writes during a sync.

use crate::db::sqlite::{insert_activity, select_activity};
use crate::error::Result;
use crate::models::CachedActivity;
use serde_json::Value;
use sqlx::{Sqlite, Transaction};

/// A batch of activity reads and writes on one open transaction.
///
/// `commit()` persists everything written through the session. Dropping the
/// session without committing rolls the batch back.
pub struct SyncSession {
    tx: Transaction<'static, Sqlite>,
    writes: usize,
}

impl SyncSession {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx, writes: 0 }
    }

    /// Cache-miss test inside the batch (sees the batch's own writes).
    pub async fn get_activity(
        &mut self,
        activity_id: u64,
        user_id: &str,
    ) -> Result<Option<CachedActivity>> {
        select_activity(&mut self.tx, activity_id, user_id).await
    }

    /// Insert a detailed activity as part of the batch.
    pub async fn store_activity(&mut self, activity: &Value, user_id: &str) -> Result<u64> {
        let id = insert_activity(&mut self.tx, activity, user_id).await?;
        self.writes += 1;
        Ok(id)
    }

    /// Number of activities written so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Commit the batch.
    pub async fn commit(self) -> Result<()> {
        let writes = self.writes;
        self.tx.commit().await?;
        tracing::debug!(writes, "Sync session committed");
        Ok(())
    }

    /// Discard the batch.
    pub async fn rollback(self) -> Result<()> {
        let writes = self.writes;
        self.tx.rollback().await?;
        tracing::debug!(writes, "Sync session rolled back");
        Ok(())
    }
}

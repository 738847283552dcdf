// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lazy, one-shot iteration over the paginated activity listing.

use crate::error::{AppError, Result};
use crate::services::strava::StravaApi;
use serde_json::Value;
use std::collections::VecDeque;

/// Activities requested per listing page.
pub const PAGE_SIZE: u32 = 50;

/// Pulls activity summaries page by page (1-based), stopping at the first
/// empty page.
///
/// The pager is exhausted after the empty page or after the first error.
pub struct ActivityPager<'a, A: ?Sized> {
    api: &'a A,
    access_token: &'a str,
    per_page: u32,
    page: u32,
    buffer: VecDeque<Value>,
    done: bool,
}

impl<'a, A: StravaApi + ?Sized> ActivityPager<'a, A> {
    pub fn new(api: &'a A, access_token: &'a str) -> Self {
        Self {
            api,
            access_token,
            per_page: PAGE_SIZE,
            page: 0,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    pub fn with_page_size(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Number of listing pages requested so far.
    pub fn pages_requested(&self) -> u32 {
        self.page
    }

    /// Next activity summary, or `None` once the listing is exhausted.
    pub async fn next_activity(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            if self.done {
                return Ok(None);
            }

            self.page += 1;
            let items = match self
                .api
                .list_activities(self.access_token, self.page, self.per_page)
                .await
            {
                Ok(items) => items,
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            };

            if items.is_empty() {
                tracing::info!(page = self.page, "Empty page received, no more pages");
                self.done = true;
                return Ok(None);
            }

            tracing::debug!(page = self.page, count = items.len(), "Retrieved activity page");
            self.buffer.extend(items);
        }
    }
}

/// Activities in full detail: each listed summary is followed by a detail
/// request, because the listing omits fields such as `private_note`.
pub struct DetailedActivities<'a, A: ?Sized> {
    pager: ActivityPager<'a, A>,
}

impl<'a, A: StravaApi + ?Sized> DetailedActivities<'a, A> {
    pub fn new(api: &'a A, access_token: &'a str) -> Self {
        Self {
            pager: ActivityPager::new(api, access_token),
        }
    }

    /// Next detailed activity, or `None` once the listing is exhausted.
    pub async fn next_activity(&mut self) -> Result<Option<Value>> {
        let Some(summary) = self.pager.next_activity().await? else {
            return Ok(None);
        };
        let id = activity_id(&summary)?;
        let detailed = self
            .pager
            .api
            .get_activity_detailed(self.pager.access_token, id)
            .await?;
        Ok(Some(detailed))
    }
}

/// Numeric `id` of a remote activity record.
pub fn activity_id(activity: &Value) -> Result<u64> {
    activity
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| AppError::MalformedRecord("Activity without numeric id".to_string()))
}

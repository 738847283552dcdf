// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - remote clients and the sync workflow.

pub mod google_sheets;
pub mod pager;
pub mod prompt;
pub mod strava;
pub mod sync;

pub use google_sheets::GoogleSheetClient;
pub use pager::{ActivityPager, DetailedActivities, PAGE_SIZE};
pub use prompt::{ConsolePrompt, FixedPrompt, RedirectPrompt};
pub use strava::{StravaApi, StravaClient};
pub use sync::{AuthorizationOutcome, SyncReport, SyncService, TokenState};

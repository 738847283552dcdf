// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod athlete;
pub mod timeline;
pub mod token;

pub use activity::{ActivityRow, CachedActivity};
pub use athlete::AthleteRow;
pub use timeline::TimelineEvent;
pub use token::{TokenGrant, TokenRecord};

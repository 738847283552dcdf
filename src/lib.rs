// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava-Timeline: cache Strava activities locally and merge them with a
//! manually kept timeline.
//!
//! This crate syncs a user's Strava activity history into a SQLite cache,
//! reads life events from a Google spreadsheet, and exports both as CSV.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod services;
pub mod time_utils;

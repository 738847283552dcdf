//! Database layer (SQLite).

pub mod session;
pub mod sqlite;

pub use session::SyncSession;
pub use sqlite::SqliteDb;

/// Schema applied when the database file is first created.
pub const BUNDLED_SCHEMA: &str = include_str!("schema.sql");

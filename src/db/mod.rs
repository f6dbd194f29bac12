//! Database layer for trial-dl
//!
//! Handles SQLite persistence for the set of processed cases.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`cases`] — Processed-case queries and the [`IdentifierStore`] implementation

use crate::error::StoreError;
use crate::types::{CaseId, CaseReference};
use sqlx::{FromRow, sqlite::SqlitePool};

mod cases;
mod migrations;

/// Existence-check + insert interface over the set of processed case ids
///
/// The crawl driver consults [`exists`](IdentifierStore::exists) before doing
/// any work for a case and calls [`insert`](IdentifierStore::insert) only
/// after the video has been written. Implementations must never report an id
/// as present unless it was inserted.
#[async_trait::async_trait]
pub trait IdentifierStore: Send + Sync {
    /// Whether `case_id` has been recorded as processed
    async fn exists(&self, case_id: &CaseId) -> std::result::Result<bool, StoreError>;

    /// Record `case` as processed. Inserting an id twice is a no-op.
    async fn insert(&self, case: &CaseReference) -> std::result::Result<(), StoreError>;
}

/// Processed case record from database
#[derive(Debug, Clone, FromRow)]
pub struct ProcessedCase {
    /// Portal case identifier
    pub case_id: CaseId,
    /// Name of the court that published the hearing
    pub case_name: String,
    /// Docket number
    pub case_no: String,
    /// Hearing title
    pub case_title: String,
    /// Hearing start time as shown by the portal
    pub publish_time: String,
    /// Unix timestamp when the case was recorded
    pub processed_at: i64,
}

/// Database handle for trial-dl
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

//! Processed-case queries.

use crate::error::StoreError;
use crate::types::{CaseId, CaseReference};

use super::{Database, IdentifierStore, ProcessedCase};

type Result<T> = std::result::Result<T, StoreError>;

impl Database {
    /// Check if a case has been processed
    pub async fn is_case_processed(&self, case_id: &CaseId) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM processed_cases WHERE case_id = ?
            "#,
        )
        .bind(case_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            StoreError::QueryFailed(format!("Failed to check if case is processed: {}", e))
        })?;

        if count > 0 {
            tracing::debug!(case_id = %case_id, "Case already processed");
        }
        Ok(count > 0)
    }

    /// Mark a case as processed
    ///
    /// The first record for an id wins; later inserts for the same id are ignored.
    pub async fn mark_case_processed(&self, case: &CaseReference) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO processed_cases (
                case_id, case_name, case_no, case_title, publish_time, processed_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(case_id) DO NOTHING
            "#,
        )
        .bind(&case.case_id)
        .bind(&case.court_name)
        .bind(&case.case_no)
        .bind(&case.case_title)
        .bind(&case.publish_time)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            StoreError::QueryFailed(format!("Failed to mark case as processed: {}", e))
        })?;

        tracing::debug!(case_id = %case.case_id, title = %case.case_title, "Recorded processed case");
        Ok(())
    }

    /// Get the stored record for a processed case
    pub async fn get_processed_case(&self, case_id: &CaseId) -> Result<Option<ProcessedCase>> {
        sqlx::query_as::<_, ProcessedCase>(
            r#"
            SELECT case_id, case_name, case_no, case_title, publish_time, processed_at
            FROM processed_cases
            WHERE case_id = ?
            "#,
        )
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to get processed case: {}", e)))
    }

    /// Count processed cases
    pub async fn count_processed_cases(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM processed_cases")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                StoreError::QueryFailed(format!("Failed to count processed cases: {}", e))
            })
    }
}

#[async_trait::async_trait]
impl IdentifierStore for Database {
    async fn exists(&self, case_id: &CaseId) -> Result<bool> {
        self.is_case_processed(case_id).await
    }

    async fn insert(&self, case: &CaseReference) -> Result<()> {
        self.mark_case_processed(case).await
    }
}

//! Database lifecycle and schema migrations.

use crate::error::StoreError;
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

use super::Database;

type Result<T> = std::result::Result<T, StoreError>;

impl Database {
    /// Create a new database connection
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to create database directory: {}",
                    e
                ))
            })?;
        }

        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to parse database path: {}", e))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to connect to database: {}", e))
        })?;

        let db = Self { pool };

        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to acquire connection: {}", e))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to create schema_version table: {}", e))
        })?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    StoreError::QueryFailed(format!("Failed to query schema version: {}", e))
                })?
                .flatten();

        let current_version = current_version.unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: Create processed_cases table
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v1");

        // Wrap migration in a transaction so partial failures don't leave the DB in a broken state
        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                StoreError::MigrationFailed(format!("Failed to begin transaction: {}", e))
            })?;

        let result = async {
            Self::create_processed_cases_table(conn).await?;
            Self::record_migration(conn, 1).await?;
            Ok::<(), StoreError>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        StoreError::MigrationFailed(format!("Failed to commit migration v1: {}", e))
                    })?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        tracing::info!("Database migration v1 complete");
        Ok(())
    }

    /// Create processed_cases table and its indexes
    async fn create_processed_cases_table(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE processed_cases (
                case_id TEXT PRIMARY KEY NOT NULL,
                case_name TEXT NOT NULL DEFAULT '',
                case_no TEXT NOT NULL DEFAULT '',
                case_title TEXT NOT NULL DEFAULT '',
                publish_time TEXT NOT NULL DEFAULT '',
                processed_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to create processed_cases table: {}", e))
        })?;

        sqlx::query(
            r#"
            CREATE INDEX idx_processed_cases_processed_at ON processed_cases(processed_at)
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!(
                "Failed to create processed_at index: {}",
                e
            ))
        })?;

        Ok(())
    }

    /// Record a migration version as applied
    async fn record_migration(conn: &mut SqliteConnection, version: i32) -> Result<()> {
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                StoreError::MigrationFailed(format!(
                    "Failed to record migration v{}: {}",
                    version, e
                ))
            })?;

        Ok(())
    }

    /// Close the database connection
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

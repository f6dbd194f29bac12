use crate::db::*;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_database_creation() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(db.pool())
            .await
            .unwrap();

    assert!(tables.contains(&"processed_cases".to_string()));
    assert!(tables.contains(&"schema_version".to_string()));

    db.close().await;
}

#[tokio::test]
async fn test_migrations_are_idempotent_across_reopen() {
    let temp_file = NamedTempFile::new().unwrap();

    {
        let db = Database::new(temp_file.path()).await.unwrap();
        db.close().await;
    }

    let db = Database::new(temp_file.path()).await.unwrap();
    let versions: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_version")
        .fetch_all(db.pool())
        .await
        .unwrap();
    assert_eq!(versions, vec![1], "v1 must be recorded exactly once");

    db.close().await;
}

#[tokio::test]
async fn test_database_creates_missing_parent_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("nested").join("state").join("trial.db");

    let db = Database::new(&db_path).await.unwrap();
    assert!(db_path.exists());

    db.close().await;
}

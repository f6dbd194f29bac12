use crate::db::*;
use crate::types::{CaseId, CaseReference};
use tempfile::NamedTempFile;

fn case(id: &str, title: &str) -> CaseReference {
    CaseReference {
        case_id: CaseId::new(id),
        case_title: title.to_string(),
        case_no: format!("(2023)云0102民初{id}号"),
        court_name: "昆明市五华区人民法院".to_string(),
        publish_time: "2023-06-01 10:30:00".to_string(),
    }
}

#[tokio::test]
async fn test_unknown_case_is_not_processed() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    assert!(!db.is_case_processed(&CaseId::new("C100")).await.unwrap());
    assert_eq!(db.count_processed_cases().await.unwrap(), 0);

    db.close().await;
}

#[tokio::test]
async fn test_mark_case_processed_then_exists() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.mark_case_processed(&case("C100", "买卖合同纠纷")).await.unwrap();

    assert!(db.is_case_processed(&CaseId::new("C100")).await.unwrap());
    assert!(!db.is_case_processed(&CaseId::new("C200")).await.unwrap());

    let stored = db
        .get_processed_case(&CaseId::new("C100"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.case_title, "买卖合同纠纷");
    assert_eq!(stored.case_name, "昆明市五华区人民法院");
    assert_eq!(stored.publish_time, "2023-06-01 10:30:00");
    assert!(stored.processed_at > 0);

    db.close().await;
}

#[tokio::test]
async fn test_insert_twice_keeps_first_record() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.mark_case_processed(&case("C100", "first")).await.unwrap();
    db.mark_case_processed(&case("C100", "second")).await.unwrap();

    assert_eq!(db.count_processed_cases().await.unwrap(), 1);
    let stored = db
        .get_processed_case(&CaseId::new("C100"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.case_title, "first");

    db.close().await;
}

#[tokio::test]
async fn test_processed_cases_persist_across_sessions() {
    let temp_file = NamedTempFile::new().unwrap();

    {
        let db = Database::new(temp_file.path()).await.unwrap();
        db.mark_case_processed(&case("C100", "hearing")).await.unwrap();
        db.close().await;
    }

    let db = Database::new(temp_file.path()).await.unwrap();
    assert!(db.is_case_processed(&CaseId::new("C100")).await.unwrap());

    db.close().await;
}

#[tokio::test]
async fn test_identifier_store_trait_delegates_to_database() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    let store: &dyn IdentifierStore = &db;

    let id = CaseId::new("37114168");
    assert!(!store.exists(&id).await.unwrap());
    store.insert(&CaseReference::from_id("37114168")).await.unwrap();
    assert!(store.exists(&id).await.unwrap());

    db.close().await;
}

#[tokio::test]
async fn test_case_ids_are_compared_exactly() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.mark_case_processed(&case("C100", "hearing")).await.unwrap();

    assert!(!db.is_case_processed(&CaseId::new("c100")).await.unwrap());
    assert!(!db.is_case_processed(&CaseId::new("C1000")).await.unwrap());
    assert!(!db.is_case_processed(&CaseId::new("C10")).await.unwrap());

    db.close().await;
}

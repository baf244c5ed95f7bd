use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;
use whoop_sync_engine::models::{DataType, RecoveryRecord, SyncStatus};
use whoop_sync_engine::repository::Repository;

async fn test_repository() -> (Repository, tempfile::TempPath) {
    let file = tempfile::NamedTempFile::new().expect("create temp db file");
    let path = file.into_temp_path();
    let pool = SqlitePool::connect(&format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .expect("connect sqlite");
    let repository = Repository::new(pool);
    repository.migrate().await.expect("migrate schema");
    (repository, path)
}

fn sample_recovery(user_id: Uuid, id: &str) -> RecoveryRecord {
    let now = Utc::now();
    RecoveryRecord {
        id: id.to_string(),
        user_id,
        cycle_id: 42,
        recovery_score: 77,
        hrv_rmssd_milli: 45.2,
        resting_heart_rate: 58,
        spo2_percentage: None,
        skin_temp_celsius: None,
        created_at: now,
        raw: json!({ "sleep_id": id }),
        fetched_at: now,
        synced_at: now,
    }
}

#[tokio::test]
async fn upsert_is_idempotent() {
    let (repository, _guard) = test_repository().await;
    let user_id = Uuid::new_v4();
    let record = sample_recovery(user_id, "abc");

    repository.upsert_recovery(&record).await.unwrap();
    repository.upsert_recovery(&record).await.unwrap();

    let rows = repository.read_recent_recovery(user_id, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "abc");
}

#[tokio::test]
async fn reads_are_scoped_to_user() {
    let (repository, _guard) = test_repository().await;
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();

    repository.upsert_recovery(&sample_recovery(user_a, "a1")).await.unwrap();
    repository.upsert_recovery(&sample_recovery(user_b, "b1")).await.unwrap();

    let rows = repository.read_recent_recovery(user_a, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, user_a);
}

#[tokio::test]
async fn sync_log_is_monotone_and_cumulative() {
    let (repository, _guard) = test_repository().await;
    let user_id = Uuid::new_v4();

    repository
        .update_sync_entry(user_id, DataType::Recovery, 3, SyncStatus::Success, None)
        .await
        .unwrap();
    let first = repository.get_sync_entry(user_id, DataType::Recovery).await.unwrap().unwrap();
    assert_eq!(first.records_synced, 3);

    repository
        .update_sync_entry(user_id, DataType::Recovery, 2, SyncStatus::Success, None)
        .await
        .unwrap();
    let second = repository.get_sync_entry(user_id, DataType::Recovery).await.unwrap().unwrap();
    assert_eq!(second.records_synced, 5);
    assert!(second.last_sync_at >= first.last_sync_at);
}

#[tokio::test]
async fn oauth_state_is_single_use() {
    let (repository, _guard) = test_repository().await;
    let user_id = Uuid::new_v4();
    let expires_at = Utc::now() + chrono::Duration::seconds(600);

    repository.insert_pending(user_id, "state-123", "verifier", expires_at).await.unwrap();

    let first = repository.consume_pending("state-123").await.unwrap();
    assert!(first.is_some());

    let second = repository.consume_pending("state-123").await.unwrap();
    assert!(second.is_none());
}

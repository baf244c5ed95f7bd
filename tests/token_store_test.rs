use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;
use whoop_sync_engine::errors::AppError;
use whoop_sync_engine::http_client;
use whoop_sync_engine::oauth_http::OAuthHttp;
use whoop_sync_engine::repository::Repository;
use whoop_sync_engine::token_store::TokenStore;

async fn test_store() -> (Arc<Repository>, TokenStore, tempfile::TempPath) {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.into_temp_path();
    let pool = SqlitePool::connect(&format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .unwrap();
    let repository = Arc::new(Repository::new(pool));
    repository.migrate().await.unwrap();

    let oauth_http = Arc::new(OAuthHttp::new(
        http_client::oauth_client(),
        "https://api.prod.whoop.com/developer/v1/".to_string(),
        "client".to_string(),
        "secret".to_string(),
    ));
    let store = TokenStore::new(Arc::clone(&repository), oauth_http);
    (repository, store, path)
}

#[tokio::test]
async fn no_link_surfaces_not_connected() {
    let (_repository, store, _guard) = test_store().await;
    let err = store.get_valid_token(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotConnected));
}

#[tokio::test]
async fn fresh_token_is_returned_without_refresh() {
    let (repository, store, _guard) = test_store().await;
    let user_id = Uuid::new_v4();

    repository
        .upsert_link(
            user_id,
            "whoop-user-1",
            "access-token-value",
            "refresh-token-value",
            Utc::now() + chrono::Duration::hours(1),
            &["read:recovery".to_string()],
        )
        .await
        .unwrap();

    let token = store.get_valid_token(user_id).await.unwrap();
    assert_eq!(token, "access-token-value");
}

#[tokio::test]
async fn disconnect_deactivates_link_and_subsequent_calls_see_not_connected() {
    let (repository, store, _guard) = test_store().await;
    let user_id = Uuid::new_v4();

    repository
        .upsert_link(
            user_id,
            "whoop-user-1",
            "access-token-value",
            "refresh-token-value",
            Utc::now() + chrono::Duration::hours(1),
            &[],
        )
        .await
        .unwrap();

    store.disconnect(user_id).await.unwrap();

    let err = store.get_valid_token(user_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotConnected));
}

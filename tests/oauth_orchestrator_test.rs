use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use whoop_sync_engine::errors::AppError;
use whoop_sync_engine::http_client;
use whoop_sync_engine::models::DataType;
use whoop_sync_engine::oauth_http::OAuthHttp;
use whoop_sync_engine::oauth_orchestrator::{OAuthOrchestrator, PkceParams};
use whoop_sync_engine::repository::Repository;
use whoop_sync_engine::token_store::TokenStore;
use whoop_sync_engine::whoop_client::{Page, UpstreamApi};

struct UnusedUpstream;

#[async_trait]
impl UpstreamApi for UnusedUpstream {
    async fn fetch(
        &self,
        _data_type: DataType,
        _access_token: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _page_cursor: Option<&str>,
        _limit: u32,
    ) -> Result<Page, AppError> {
        unreachable!("not exercised by these tests")
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<String, AppError> {
        unreachable!("not exercised by these tests")
    }
}

async fn setup() -> (Arc<Repository>, OAuthOrchestrator, tempfile::TempPath) {
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
    let token_store = Arc::new(TokenStore::new(Arc::clone(&repository), Arc::clone(&oauth_http)));

    let orchestrator = OAuthOrchestrator::new(
        Arc::clone(&repository),
        oauth_http,
        token_store,
        Arc::new(UnusedUpstream),
        chrono::Duration::seconds(600),
    );

    (repository, orchestrator, path)
}

#[test]
fn pkce_challenge_is_derived_from_verifier_and_both_are_high_entropy() {
    let params = PkceParams::generate();
    assert!(params.verifier.len() >= 43);
    assert_ne!(params.verifier, params.challenge);

    let other = PkceParams::generate();
    assert_ne!(params.verifier, other.verifier, "verifiers must not repeat");
}

#[tokio::test]
async fn begin_persists_a_pending_row_bound_to_the_state() {
    let (repository, orchestrator, _guard) = setup().await;
    let user_id = Uuid::new_v4();

    let (authorization_url, state) = orchestrator
        .begin(user_id, "https://example.com/callback", &["read:recovery".to_string()])
        .await
        .unwrap();

    assert!(authorization_url.contains("code_challenge="));
    assert!(authorization_url.contains(&state));

    let consumed = repository.consume_pending(&state).await.unwrap();
    assert!(consumed.is_some());
    assert_eq!(consumed.unwrap().0, user_id);
}

#[tokio::test]
async fn complete_with_unknown_state_is_rejected() {
    let (_repository, orchestrator, _guard) = setup().await;

    let err = orchestrator
        .complete("some-code", "state-that-was-never-issued", "https://example.com/callback")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidState));
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;
use whoop_sync_engine::config::EngineConfig;
use whoop_sync_engine::errors::AppError;
use whoop_sync_engine::http_client;
use whoop_sync_engine::models::DataType;
use whoop_sync_engine::oauth_http::OAuthHttp;
use whoop_sync_engine::repository::Repository;
use whoop_sync_engine::sync_orchestrator::SyncOrchestrator;
use whoop_sync_engine::token_store::TokenStore;
use whoop_sync_engine::whoop_client::{Page, UpstreamApi};

struct FakeUpstream {
    calls: AtomicUsize,
    recovery_payload: serde_json::Value,
}

#[async_trait]
impl UpstreamApi for FakeUpstream {
    async fn fetch(
        &self,
        data_type: DataType,
        _access_token: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _page_cursor: Option<&str>,
        _limit: u32,
    ) -> Result<Page, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let records = match data_type {
            DataType::Recovery => vec![self.recovery_payload.clone()],
            _ => vec![],
        };
        Ok(Page {
            records,
            next_token: None,
        })
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<String, AppError> {
        Ok("whoop-user-1".to_string())
    }
}

fn base_config() -> EngineConfig {
    EngineConfig {
        database_url: String::new(),
        upstream_base_url: "https://api.prod.whoop.com/developer/v1/".to_string(),
        upstream_client_id: "client".to_string(),
        upstream_client_secret: "secret".to_string(),
        upstream_redirect_uri: "https://example.com/callback".to_string(),
        rate_limit_per_minute: 80,
        rate_limit_per_day: 8000,
        freshness_recovery: std::time::Duration::from_secs(7200),
        freshness_sleep: std::time::Duration::from_secs(7200),
        freshness_cycle: std::time::Duration::from_secs(7200),
        freshness_workout: std::time::Duration::from_secs(3600),
        initial_backfill_days: 30,
        http_timeout: std::time::Duration::from_secs(30),
        oauth_state_ttl: std::time::Duration::from_secs(600),
        log_format: whoop_sync_engine::config::LogFormat::Pretty,
    }
}

async fn setup() -> (Arc<Repository>, Arc<SyncOrchestrator>, Arc<FakeUpstream>, tempfile::TempPath, Uuid) {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.into_temp_path();
    let pool = SqlitePool::connect(&format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .unwrap();
    let repository = Arc::new(Repository::new(pool));
    repository.migrate().await.unwrap();

    let user_id = Uuid::new_v4();
    repository
        .upsert_link(
            user_id,
            "whoop-user-1",
            "access-token",
            "refresh-token",
            Utc::now() + chrono::Duration::hours(1),
            &["read:recovery".to_string()],
        )
        .await
        .unwrap();

    let oauth_http = Arc::new(OAuthHttp::new(
        http_client::oauth_client(),
        "https://api.prod.whoop.com/developer/v1/".to_string(),
        "client".to_string(),
        "secret".to_string(),
    ));
    let token_store = Arc::new(TokenStore::new(Arc::clone(&repository), oauth_http));

    let upstream = Arc::new(FakeUpstream {
        calls: AtomicUsize::new(0),
        recovery_payload: json!({
            "sleep_id": "abc",
            "cycle_id": 42,
            "score": { "recovery_score": 77, "hrv_rmssd_milli": 45.2, "resting_heart_rate": 58.0 }
        }),
    });

    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::clone(&repository),
        token_store,
        upstream.clone() as Arc<dyn UpstreamApi>,
        base_config(),
    ));

    (repository, orchestrator, upstream, path, user_id)
}

#[tokio::test]
async fn initial_sync_fetches_and_persists() {
    let (repository, orchestrator, upstream, _guard, user_id) = setup().await;

    let outcome = orchestrator.sync(user_id, Some(vec![DataType::Recovery]), None).await.unwrap();
    assert_eq!(outcome.results[0].records_synced, 1);
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);

    let rows = repository.read_recent_recovery(user_id, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "abc");
}

#[tokio::test]
async fn repeated_sync_is_idempotent_and_does_not_duplicate_rows() {
    let (repository, orchestrator, _upstream, _guard, user_id) = setup().await;

    orchestrator.sync(user_id, Some(vec![DataType::Recovery]), None).await.unwrap();
    orchestrator.sync(user_id, Some(vec![DataType::Recovery]), None).await.unwrap();

    let rows = repository.read_recent_recovery(user_id, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn fresh_sync_log_skips_upstream_call() {
    let (_repository, orchestrator, upstream, _guard, user_id) = setup().await;

    let result = orchestrator
        .serve_by_type(user_id, DataType::Recovery, 10, false)
        .await
        .unwrap();
    assert_eq!(result.source, "whoop_api");
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);

    let cached = orchestrator
        .serve_by_type(user_id, DataType::Recovery, 10, false)
        .await
        .unwrap();
    assert_eq!(cached.source, "cache");
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn force_refresh_always_hits_upstream() {
    let (_repository, orchestrator, upstream, _guard, user_id) = setup().await;

    orchestrator.serve_by_type(user_id, DataType::Recovery, 10, false).await.unwrap();
    orchestrator.serve_by_type(user_id, DataType::Recovery, 10, true).await.unwrap();

    assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
}

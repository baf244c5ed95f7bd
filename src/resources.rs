//! Shared application state, constructed once at startup and handed to
//! every route handler behind an `Arc`.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::EngineConfig;
use crate::http_client;
use crate::identity::IdentityVerifier;
use crate::oauth_http::OAuthHttp;
use crate::oauth_orchestrator::OAuthOrchestrator;
use crate::pacer::RatePacer;
use crate::repository::Repository;
use crate::sync_orchestrator::SyncOrchestrator;
use crate::token_store::TokenStore;
use crate::whoop_client::{UpstreamApi, WhoopClient};

pub struct Resources {
    pub config: EngineConfig,
    pub identity: Arc<dyn IdentityVerifier>,
    pub sync_orchestrator: Arc<SyncOrchestrator>,
    pub oauth_orchestrator: Arc<OAuthOrchestrator>,
    pub token_store: Arc<TokenStore>,
}

impl Resources {
    pub async fn bootstrap(
        config: EngineConfig,
        identity: Arc<dyn IdentityVerifier>,
    ) -> anyhow::Result<Arc<Self>> {
        let pool = SqlitePool::connect(&config.database_url).await?;
        let repository = Arc::new(Repository::new(pool));
        repository.migrate().await.map_err(|e| anyhow::anyhow!("{e}"))?;

        let pacer = Arc::new(RatePacer::new(config.rate_limit_per_minute, config.rate_limit_per_day));
        let upstream: Arc<dyn UpstreamApi> = Arc::new(WhoopClient::new(
            http_client::api_client(config.http_timeout),
            config.upstream_base_url.clone(),
            pacer,
        ));

        let oauth_http = Arc::new(OAuthHttp::new(
            http_client::oauth_client(),
            config.upstream_base_url.clone(),
            config.upstream_client_id.clone(),
            config.upstream_client_secret.clone(),
        ));

        let token_store = Arc::new(TokenStore::new(Arc::clone(&repository), Arc::clone(&oauth_http)));

        let oauth_orchestrator = Arc::new(OAuthOrchestrator::new(
            Arc::clone(&repository),
            Arc::clone(&oauth_http),
            Arc::clone(&token_store),
            Arc::clone(&upstream),
            chrono::Duration::from_std(config.oauth_state_ttl).unwrap_or(chrono::Duration::seconds(600)),
        ));

        let sync_orchestrator = Arc::new(SyncOrchestrator::new(
            Arc::clone(&repository),
            Arc::clone(&token_store),
            Arc::clone(&upstream),
            config.clone(),
        ));

        Ok(Arc::new(Self {
            config,
            identity,
            sync_orchestrator,
            oauth_orchestrator,
            token_store,
        }))
    }
}

//! OAuth Orchestrator (§4.C): authorization-code-with-PKCE flow.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::AppError;
use crate::oauth_http::OAuthHttp;
use crate::repository::Repository;
use crate::token_store::TokenStore;
use crate::whoop_client::UpstreamApi;

const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

pub struct OAuthOrchestrator {
    repository: Arc<Repository>,
    oauth_http: Arc<OAuthHttp>,
    token_store: Arc<TokenStore>,
    upstream: Arc<dyn UpstreamApi>,
    state_ttl: chrono::Duration,
}

pub struct PkceParams {
    pub verifier: String,
    pub challenge: String,
}

impl PkceParams {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let verifier: String = (0..64)
            .map(|_| VERIFIER_CHARSET[rng.gen_range(0..VERIFIER_CHARSET.len())] as char)
            .collect();
        let digest = Sha256::digest(verifier.as_bytes());
        let challenge = URL_SAFE_NO_PAD.encode(digest);
        Self { verifier, challenge }
    }
}

fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl OAuthOrchestrator {
    pub fn new(
        repository: Arc<Repository>,
        oauth_http: Arc<OAuthHttp>,
        token_store: Arc<TokenStore>,
        upstream: Arc<dyn UpstreamApi>,
        state_ttl: chrono::Duration,
    ) -> Self {
        Self {
            repository,
            oauth_http,
            token_store,
            upstream,
            state_ttl,
        }
    }

    pub async fn begin(
        &self,
        user_id: Uuid,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<(String, String), AppError> {
        let pkce = PkceParams::generate();
        let state = generate_state();
        let expires_at = Utc::now() + self.state_ttl;

        self.repository
            .insert_pending(user_id, &state, &pkce.verifier, expires_at)
            .await?;

        let authorization_url =
            self.oauth_http
                .authorization_url(redirect_uri, scopes, &state, &pkce.challenge);

        Ok((authorization_url, state))
    }

    pub async fn complete(&self, code: &str, state: &str, redirect_uri: &str) -> Result<(), AppError> {
        let pending = self
            .repository
            .consume_pending(state)
            .await?
            .ok_or(AppError::InvalidState)?;

        let (user_id, code_verifier, expires_at) = pending;
        if Utc::now() > expires_at {
            return Err(AppError::InvalidState);
        }

        let tokens = self
            .oauth_http
            .exchange_code(code, &code_verifier, redirect_uri)
            .await?;

        let whoop_user_id = self
            .upstream
            .fetch_profile(&tokens.access_token)
            .await
            .unwrap_or_default();

        self.token_store
            .store_tokens(
                user_id,
                &whoop_user_id,
                &tokens.access_token,
                &tokens.refresh_token,
                tokens.expires_at,
                &tokens.scopes,
            )
            .await
    }
}

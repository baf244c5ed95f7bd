//! Token Store & Refresher (§4.B).

use std::sync::Arc;

use uuid::Uuid;

use crate::constants::TOKEN_EXPIRY_SKEW_SECONDS;
use crate::errors::AppError;
use crate::locks::TokenRefreshLocks;
use crate::oauth_http::OAuthHttp;
use crate::repository::Repository;

pub struct TokenStore {
    repository: Arc<Repository>,
    oauth_http: Arc<OAuthHttp>,
    refresh_locks: TokenRefreshLocks,
}

impl TokenStore {
    pub fn new(repository: Arc<Repository>, oauth_http: Arc<OAuthHttp>) -> Self {
        Self {
            repository,
            oauth_http,
            refresh_locks: TokenRefreshLocks::new(),
        }
    }

    pub async fn store_tokens(
        &self,
        user_id: Uuid,
        whoop_user_id: &str,
        access_token: &str,
        refresh_token: &str,
        expires_at: chrono::DateTime<chrono::Utc>,
        scopes: &[String],
    ) -> Result<(), AppError> {
        self.repository
            .upsert_link(user_id, whoop_user_id, access_token, refresh_token, expires_at, scopes)
            .await
    }

    pub async fn disconnect(&self, user_id: Uuid) -> Result<(), AppError> {
        self.repository.deactivate_link(user_id).await
    }

    /// Returns a currently-valid access token, refreshing first if needed.
    /// Concurrent calls for the same user coalesce onto a single refresh so
    /// a rotated refresh token is never spent twice.
    pub async fn get_valid_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let repository = Arc::clone(&self.repository);
        let oauth_http = Arc::clone(&self.oauth_http);

        self.refresh_locks
            .with_lock(user_id, || async move {
                let link = repository
                    .get_link(user_id)
                    .await?
                    .filter(|link| link.is_active)
                    .ok_or(AppError::NotConnected)?;

                if link.is_token_fresh(chrono::Utc::now(), TOKEN_EXPIRY_SKEW_SECONDS) {
                    return Ok(link.access_token);
                }

                match oauth_http.refresh(&link.refresh_token).await {
                    Ok(tokens) => {
                        repository
                            .upsert_link(
                                user_id,
                                &link.whoop_user_id,
                                &tokens.access_token,
                                &tokens.refresh_token,
                                tokens.expires_at,
                                &tokens.scopes,
                            )
                            .await?;
                        Ok(tokens.access_token)
                    }
                    Err(_) => {
                        repository.deactivate_link(user_id).await?;
                        Err(AppError::NotConnected)
                    }
                }
            })
            .await
    }
}

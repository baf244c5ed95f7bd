//! Shared token-endpoint plumbing used by both the OAuth Orchestrator
//! (authorization-code exchange) and the Token Store (refresh grant).

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::constants;
use crate::errors::AppError;

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

pub struct OAuthHttp {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
}

pub struct ExchangedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
}

impl OAuthHttp {
    pub fn new(http: Client, base_url: String, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            base_url,
            client_id,
            client_secret,
        }
    }

    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        scopes: &[String],
        state: &str,
        code_challenge: &str,
    ) -> String {
        let url = format!("{}{}", self.base_url, constants::AUTHORIZE_ENDPOINT_PATH);
        let scope = scopes.join(" ");
        format!(
            "{url}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
            encode(&self.client_id),
            encode(redirect_uri),
            encode(&scope),
            encode(state),
            encode(code_challenge),
        )
    }

    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<ExchangedTokens, AppError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ];
        self.post_token(&params).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<ExchangedTokens, AppError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ];
        self.post_token(&params).await
    }

    async fn post_token(&self, params: &[(&str, &str)]) -> Result<ExchangedTokens, AppError> {
        let url = format!("{}{}", self.base_url, constants::TOKEN_ENDPOINT_PATH);
        let response = self
            .http
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|err| AppError::UpstreamTransient {
                internal: err.to_string(),
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::BAD_REQUEST
        {
            return Err(AppError::NotConnected);
        }
        if !response.status().is_success() {
            return Err(AppError::UpstreamPermanent {
                internal: format!("token endpoint returned {}", response.status()),
            });
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|err| AppError::UpstreamTransient {
                internal: err.to_string(),
            })?;

        Ok(ExchangedTokens {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            expires_at: Utc::now() + chrono::Duration::seconds(parsed.expires_in),
            scopes: parsed
                .scope
                .map(|s| s.split(' ').map(String::from).collect())
                .unwrap_or_default(),
        })
    }
}

//! Upstream Client (§4.A): rate-limited, retrying, paginated HTTP access to
//! WHOOP's developer API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::constants::{self, RETRY_BACKOFF_SECONDS};
use crate::errors::AppError;
use crate::models::DataType;
use crate::pacer::RatePacer;

#[derive(Debug, Clone)]
pub struct Page {
    pub records: Vec<Value>,
    pub next_token: Option<String>,
}

/// Seam between the Sync Orchestrator and the real upstream, so tests can
/// supply a fake without making network calls (no HTTP-mocking crate is
/// available in this workspace's test tooling).
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    async fn fetch(
        &self,
        data_type: DataType,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page_cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page, AppError>;

    async fn fetch_profile(&self, access_token: &str) -> Result<String, AppError>;
}

pub struct WhoopClient {
    http: Client,
    base_url: String,
    pacer: Arc<RatePacer>,
}

#[derive(Deserialize)]
struct DataResponse {
    records: Vec<Value>,
    next_token: Option<String>,
}

#[derive(Deserialize)]
struct ProfileResponse {
    user_id: Value,
}

impl WhoopClient {
    pub fn new(http: Client, base_url: String, pacer: Arc<RatePacer>) -> Self {
        Self {
            http,
            base_url,
            pacer,
        }
    }

    fn path_for(&self, data_type: DataType) -> &'static str {
        match data_type {
            DataType::Recovery => constants::RECOVERY_PATH,
            DataType::Sleep => constants::SLEEP_PATH,
            DataType::Workout => constants::WORKOUT_PATH,
            DataType::Cycle => constants::CYCLE_PATH,
        }
    }

    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, String)],
        access_token: &str,
    ) -> Result<reqwest::Response, AppError> {
        let mut attempt = 0usize;
        loop {
            self.pacer.acquire().await;

            let response = self
                .http
                .get(url)
                .bearer_auth(access_token)
                .query(query)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if resp.status() == StatusCode::UNAUTHORIZED => {
                    return Err(AppError::NotConnected);
                }
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = resp
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(1);
                    if attempt == 0 {
                        tokio::time::sleep(Duration::from_secs(retry_after)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(AppError::RateLimited {
                        retry_after_secs: retry_after,
                    });
                }
                Ok(resp) if resp.status().is_server_error() => {
                    if attempt < RETRY_BACKOFF_SECONDS.len() {
                        tokio::time::sleep(Duration::from_secs(RETRY_BACKOFF_SECONDS[attempt])).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(AppError::UpstreamTransient {
                        internal: format!("upstream returned {}", resp.status()),
                    });
                }
                Ok(resp) if resp.status() == StatusCode::NOT_FOUND => {
                    return Err(AppError::UpstreamPermanent {
                        internal: "not found".to_string(),
                    });
                }
                Ok(resp) => {
                    return Err(AppError::UpstreamPermanent {
                        internal: format!("upstream returned {}", resp.status()),
                    });
                }
                Err(err) if err.is_timeout() || err.is_connect() => {
                    if attempt < RETRY_BACKOFF_SECONDS.len() {
                        tokio::time::sleep(Duration::from_secs(RETRY_BACKOFF_SECONDS[attempt])).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(AppError::UpstreamTransient {
                        internal: err.to_string(),
                    });
                }
                Err(err) => {
                    return Err(AppError::UpstreamTransient {
                        internal: err.to_string(),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl UpstreamApi for WhoopClient {
    async fn fetch(
        &self,
        data_type: DataType,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page_cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page, AppError> {
        let url = format!("{}{}", self.base_url, self.path_for(data_type));
        let mut query = vec![
            ("start", start.to_rfc3339()),
            ("end", end.to_rfc3339()),
            ("limit", limit.to_string()),
        ];
        if let Some(token) = page_cursor {
            query.push(("nextToken", token.to_string()));
        }

        let response = self.get_with_retry(&url, &query, access_token).await?;
        let parsed: DataResponse = response.json().await.map_err(|err| AppError::UpstreamTransient {
            internal: err.to_string(),
        })?;

        Ok(Page {
            records: parsed.records,
            next_token: parsed.next_token,
        })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<String, AppError> {
        let url = format!("{}{}", self.base_url, constants::PROFILE_PATH);
        let response = self.get_with_retry(&url, &[], access_token).await?;
        let parsed: ProfileResponse = response.json().await.map_err(|err| AppError::UpstreamTransient {
            internal: err.to_string(),
        })?;

        Ok(match parsed.user_id {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }
}

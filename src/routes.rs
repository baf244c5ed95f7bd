//! HTTP surface (§6.1).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::identity::extract_bearer;
use crate::models::DataType;
use crate::resources::Resources;

pub fn router(resources: Arc<Resources>) -> Router {
    Router::new()
        .route("/oauth/initiate", post(oauth_initiate))
        .route("/oauth/callback", get(oauth_callback))
        .route("/oauth/connection", delete(oauth_disconnect))
        .route("/daily/:date", get(daily))
        .route("/data/:data_type", get(data_by_type))
        .route("/sync", post(sync))
        .route("/sync/status", get(sync_status))
        .with_state(resources)
}

async fn authenticate(headers: &HeaderMap, resources: &Resources) -> Result<Uuid, AppError> {
    let header_value = headers.get("Authorization").and_then(|v| v.to_str().ok());
    let bearer = extract_bearer(header_value)?;
    resources.identity.verify(bearer).await
}

#[derive(Deserialize)]
struct InitiateRequest {
    redirect_uri: String,
    #[serde(default)]
    scopes: Vec<String>,
}

async fn oauth_initiate(
    State(resources): State<Arc<Resources>>,
    headers: HeaderMap,
    Json(body): Json<InitiateRequest>,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers, &resources).await?;
    let (authorization_url, state) = resources
        .oauth_orchestrator
        .begin(user_id, &body.redirect_uri, &body.scopes)
        .await?;

    Ok(Json(json!({ "authorization_url": authorization_url, "state": state })).into_response())
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: String,
    state: String,
}

async fn oauth_callback(
    State(resources): State<Arc<Resources>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    resources
        .oauth_orchestrator
        .complete(&query.code, &query.state, &resources.config.upstream_redirect_uri)
        .await?;

    Ok(Json(json!({ "success": true })).into_response())
}

async fn oauth_disconnect(
    State(resources): State<Arc<Resources>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers, &resources).await?;
    resources.token_store.disconnect(user_id).await?;
    Ok(Json(json!({ "success": true })).into_response())
}

async fn daily(
    State(resources): State<Arc<Resources>>,
    headers: HeaderMap,
    Path(date): Path<String>,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers, &resources).await?;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInput("date must be YYYY-MM-DD".to_string()))?;

    let summary = resources.sync_orchestrator.serve_daily(user_id, date, false).await?;
    Ok(Json(summary).into_response())
}

#[derive(Deserialize)]
struct DataQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    force_refresh: bool,
}

fn default_limit() -> u32 {
    25
}

async fn data_by_type(
    State(resources): State<Arc<Resources>>,
    headers: HeaderMap,
    Path(data_type): Path<String>,
    Query(query): Query<DataQuery>,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers, &resources).await?;
    let data_type = DataType::parse(&data_type)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown data type '{data_type}'")))?;

    let result = resources
        .sync_orchestrator
        .serve_by_type(user_id, data_type, query.limit, query.force_refresh)
        .await?;

    Ok(Json(json!({
        "status": result.status,
        "data": result.data,
        "metadata": {
            "source": result.source,
            "record_count": result.record_count,
            "last_sync_at": result.last_sync_at,
            "warning": result.warning,
        }
    }))
    .into_response())
}

#[derive(Deserialize)]
struct DateRange {
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
}

#[derive(Deserialize)]
struct SyncRequest {
    #[serde(default)]
    types: Option<Vec<String>>,
    #[serde(default)]
    date_range: Option<DateRange>,
}

async fn sync(
    State(resources): State<Arc<Resources>>,
    headers: HeaderMap,
    Json(body): Json<SyncRequest>,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers, &resources).await?;

    let types = body
        .types
        .map(|names| {
            names
                .iter()
                .filter_map(|name| DataType::parse(name))
                .collect::<Vec<_>>()
        });
    let time_range = body.date_range.map(|r| (r.start, r.end));

    let outcome = resources.sync_orchestrator.sync(user_id, types, time_range).await?;

    let synced: HashMap<&str, i64> = outcome
        .results
        .iter()
        .map(|r| (r.data_type.as_str(), r.records_synced))
        .collect();

    Ok(Json(json!({ "synced": synced, "total_api_calls": outcome.total_api_calls })).into_response())
}

async fn sync_status(
    State(resources): State<Arc<Resources>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers, &resources).await?;
    let status = resources.sync_orchestrator.sync_status(user_id).await?;

    let body: HashMap<&str, serde_json::Value> = status
        .into_iter()
        .map(|(data_type, entry)| {
            let value = match entry {
                Some(e) => json!({
                    "last_sync_at": e.last_sync_at,
                    "sync_status": e.sync_status.as_str(),
                    "records_synced": e.records_synced,
                    "needs_sync": e.sync_status == crate::models::SyncStatus::Failed,
                    "error_message": e.error_message,
                }),
                None => json!({ "needs_sync": true }),
            };
            (data_type.as_str(), value)
        })
        .collect();

    Ok(Json(body).into_response())
}

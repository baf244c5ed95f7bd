//! Sync Orchestrator (§4.F): freshness decision + fetch → normalize →
//! persist → log pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::constants::{SINGLE_PAGE_LIMIT, WORKOUT_SYNC_RECORD_CAP};
use crate::errors::AppError;
use crate::locks::SyncLocks;
use crate::models::{DataType, SyncStatus};
use crate::normalizer;
use crate::repository::Repository;
use crate::token_store::TokenStore;
use crate::whoop_client::UpstreamApi;

pub struct SyncOrchestrator {
    repository: Arc<Repository>,
    token_store: Arc<TokenStore>,
    upstream: Arc<dyn UpstreamApi>,
    sync_locks: SyncLocks,
    config: EngineConfig,
}

#[derive(Debug, Serialize)]
pub struct SyncTypeResult {
    pub data_type: DataType,
    pub records_synced: i64,
    pub status: SyncStatus,
}

#[derive(Debug, Serialize)]
pub struct SyncOutcome {
    pub results: Vec<SyncTypeResult>,
    pub total_api_calls: u32,
}

#[derive(Debug, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub recovery: Vec<crate::models::RecoveryRecord>,
    pub sleep: Vec<crate::models::SleepRecord>,
    pub workouts: Vec<crate::models::WorkoutRecord>,
    pub cycle: Vec<crate::models::CycleRecord>,
    pub last_sync: Option<DateTime<Utc>>,
    pub data_source: &'static str,
}

pub struct ServeResult<T> {
    pub data: Vec<T>,
    pub source: &'static str,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub warning: Option<String>,
}

impl SyncOrchestrator {
    pub fn new(
        repository: Arc<Repository>,
        token_store: Arc<TokenStore>,
        upstream: Arc<dyn UpstreamApi>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repository,
            token_store,
            upstream,
            sync_locks: SyncLocks::new(),
            config,
        }
    }

    fn threshold(&self, data_type: DataType) -> chrono::Duration {
        let duration = match data_type {
            DataType::Recovery => self.config.freshness_recovery,
            DataType::Sleep => self.config.freshness_sleep,
            DataType::Cycle => self.config.freshness_cycle,
            DataType::Workout => self.config.freshness_workout,
        };
        chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::hours(2))
    }

    /// §4.F freshness decision.
    async fn needs_sync(&self, user_id: Uuid, data_type: DataType, force_refresh: bool) -> Result<bool, AppError> {
        if force_refresh {
            return Ok(true);
        }
        let entry = self.repository.get_sync_entry(user_id, data_type).await?;
        Ok(match entry {
            None => true,
            Some(entry) => {
                entry.sync_status == SyncStatus::Failed
                    || Utc::now() - entry.last_sync_at > self.threshold(data_type)
            }
        })
    }

    /// Runs the sync pipeline for one (user, data_type), serialized via the
    /// per-(user, data_type) lock so overlapping reads don't double-fetch.
    /// `time_range`, when given, overrides the normal last-sync/backfill window (§4.F step 2).
    async fn sync_one(
        &self,
        user_id: Uuid,
        data_type: DataType,
        time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<SyncTypeResult, AppError> {
        let repository = Arc::clone(&self.repository);
        let token_store = Arc::clone(&self.token_store);
        let upstream = Arc::clone(&self.upstream);
        let backfill_days = self.config.initial_backfill_days;

        self.sync_locks
            .with_lock((user_id, data_type), move || async move {
                let access_token = token_store.get_valid_token(user_id).await?;

                let (start, end) = match time_range {
                    Some(range) => range,
                    None => {
                        let entry = repository.get_sync_entry(user_id, data_type).await?;
                        let start = entry
                            .as_ref()
                            .map(|e| e.last_sync_at)
                            .unwrap_or_else(|| Utc::now() - chrono::Duration::days(backfill_days));
                        (start, Utc::now())
                    }
                };

                let fetch_result = fetch_all_pages(upstream.as_ref(), data_type, &access_token, start, end).await;

                match fetch_result {
                    Ok((pages, hit_cap)) => {
                        let mut synced = 0i64;
                        for raw in &pages {
                            let persisted = persist_one(&repository, data_type, raw, user_id, Utc::now()).await?;
                            if persisted {
                                synced += 1;
                            }
                        }
                        let status = if hit_cap { SyncStatus::Partial } else { SyncStatus::Success };
                        repository
                            .update_sync_entry(user_id, data_type, synced, status, None)
                            .await?;
                        Ok(SyncTypeResult {
                            data_type,
                            records_synced: synced,
                            status,
                        })
                    }
                    Err(err) => {
                        repository
                            .update_sync_entry(user_id, data_type, 0, SyncStatus::Failed, Some(&err.to_string()))
                            .await?;
                        Err(err)
                    }
                }
            })
            .await
    }

    /// Forces a sync of the selected types (or all four) within an optional
    /// explicit window; falling back to the normal last-sync/backfill window
    /// when `time_range` is absent.
    pub async fn sync(
        &self,
        user_id: Uuid,
        types: Option<Vec<DataType>>,
        time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<SyncOutcome, AppError> {
        let types = types.unwrap_or_else(|| DataType::ALL.to_vec());
        let mut results = Vec::new();

        for data_type in types {
            match self.sync_one(user_id, data_type, time_range).await {
                Ok(result) => results.push(result),
                Err(_err) => results.push(SyncTypeResult {
                    data_type,
                    records_synced: 0,
                    status: SyncStatus::Failed,
                }),
            }
        }

        Ok(SyncOutcome {
            total_api_calls: results.len() as u32,
            results,
        })
    }

    pub async fn serve_by_type(
        &self,
        user_id: Uuid,
        data_type: DataType,
        limit: u32,
        force_refresh: bool,
    ) -> Result<ServeResultJson, AppError> {
        let needs_sync = self.needs_sync(user_id, data_type, force_refresh).await?;
        let mut warning = None;
        let mut source = "cache";

        if needs_sync {
            match self.sync_one(user_id, data_type, None).await {
                Ok(_) => source = "whoop_api",
                Err(err) => {
                    if force_refresh {
                        return Err(err);
                    }
                    warning = Some("sync failed, returning stale cached data".to_string());
                }
            }
        }

        let entry = self.repository.get_sync_entry(user_id, data_type).await?;
        let data = read_recent_json(&self.repository, data_type, user_id, limit).await?;
        let record_count = data.len();

        Ok(ServeResultJson {
            status: if warning.is_some() { "stale_cache" } else { "ok" },
            data,
            source: if warning.is_some() { "stale_cache" } else { source },
            last_sync_at: entry.as_ref().map(|e| e.last_sync_at),
            record_count,
            warning,
        })
    }

    pub async fn serve_daily(&self, user_id: Uuid, date: NaiveDate, force_refresh: bool) -> Result<DailySummary, AppError> {
        for data_type in DataType::ALL {
            if self.needs_sync(user_id, data_type, force_refresh).await? {
                let _ = self.sync_one(user_id, data_type, None).await;
            }
        }

        let recovery = self.repository.read_daily_recovery(user_id, date).await?;
        let sleep = self.repository.read_daily_sleep(user_id, date).await?;
        let workouts = self.repository.read_daily_workout(user_id, date).await?;
        let cycle = self.repository.read_daily_cycle(user_id, date).await?;

        let last_sync = self
            .repository
            .get_sync_entry(user_id, DataType::Recovery)
            .await?
            .map(|e| e.last_sync_at);

        Ok(DailySummary {
            date,
            recovery,
            sleep,
            workouts,
            cycle,
            last_sync,
            data_source: "database",
        })
    }

    pub async fn sync_status(&self, user_id: Uuid) -> Result<HashMap<DataType, Option<crate::models::SyncLogEntry>>, AppError> {
        let mut map = HashMap::new();
        for data_type in DataType::ALL {
            map.insert(data_type, self.repository.get_sync_entry(user_id, data_type).await?);
        }
        Ok(map)
    }
}

#[derive(Debug, Serialize)]
pub struct ServeResultJson {
    pub status: &'static str,
    pub data: Vec<serde_json::Value>,
    pub source: &'static str,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub record_count: usize,
    pub warning: Option<String>,
}

async fn fetch_all_pages(
    upstream: &dyn UpstreamApi,
    data_type: DataType,
    access_token: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(Vec<serde_json::Value>, bool), AppError> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;
    let mut hit_cap = false;

    loop {
        let page = upstream
            .fetch(data_type, access_token, start, end, cursor.as_deref(), SINGLE_PAGE_LIMIT)
            .await?;
        records.extend(page.records);

        let paginate_further = matches!(data_type, DataType::Workout) && page.next_token.is_some();
        if data_type == DataType::Workout && records.len() >= WORKOUT_SYNC_RECORD_CAP {
            hit_cap = true;
            break;
        }
        if !paginate_further {
            break;
        }
        cursor = page.next_token;
    }

    Ok((records, hit_cap))
}

async fn persist_one(
    repository: &Repository,
    data_type: DataType,
    raw: &serde_json::Value,
    user_id: Uuid,
    fetched_at: DateTime<Utc>,
) -> Result<bool, AppError> {
    match data_type {
        DataType::Recovery => match normalizer::normalize_recovery(raw, user_id, fetched_at) {
            Some(record) => {
                repository.upsert_recovery(&record).await?;
                Ok(true)
            }
            None => Ok(false),
        },
        DataType::Sleep => match normalizer::normalize_sleep(raw, user_id) {
            Some(record) => {
                repository.upsert_sleep(&record).await?;
                Ok(true)
            }
            None => Ok(false),
        },
        DataType::Workout => match normalizer::normalize_workout(raw, user_id) {
            Some(record) => {
                repository.upsert_workout(&record).await?;
                Ok(true)
            }
            None => Ok(false),
        },
        DataType::Cycle => match normalizer::normalize_cycle(raw, user_id) {
            Some(record) => {
                repository.upsert_cycle(&record).await?;
                Ok(true)
            }
            None => Ok(false),
        },
    }
}

async fn read_recent_json(
    repository: &Repository,
    data_type: DataType,
    user_id: Uuid,
    limit: u32,
) -> Result<Vec<serde_json::Value>, AppError> {
    Ok(match data_type {
        DataType::Recovery => repository
            .read_recent_recovery(user_id, limit)
            .await?
            .into_iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect(),
        DataType::Sleep => repository
            .read_recent_sleep(user_id, limit)
            .await?
            .into_iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect(),
        DataType::Workout => repository
            .read_recent_workout(user_id, limit)
            .await?
            .into_iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect(),
        DataType::Cycle => repository
            .read_recent_cycle(user_id, limit)
            .await?
            .into_iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect(),
    })
}

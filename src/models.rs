//! Domain types (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Recovery,
    Sleep,
    Workout,
    Cycle,
}

impl DataType {
    pub const ALL: [DataType; 4] = [
        DataType::Recovery,
        DataType::Sleep,
        DataType::Workout,
        DataType::Cycle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Recovery => crate::constants::data_type::RECOVERY,
            DataType::Sleep => crate::constants::data_type::SLEEP,
            DataType::Workout => crate::constants::data_type::WORKOUT,
            DataType::Cycle => crate::constants::data_type::CYCLE,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "recovery" => Some(DataType::Recovery),
            "sleep" => Some(DataType::Sleep),
            "workout" => Some(DataType::Workout),
            "cycle" => Some(DataType::Cycle),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Partial,
    Failed,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Partial => "partial",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "success" => SyncStatus::Success,
            "partial" => SyncStatus::Partial,
            _ => SyncStatus::Failed,
        }
    }
}

/// Per-user durable OAuth link to the upstream account.
#[derive(Debug, Clone, Serialize)]
pub struct WhoopLink {
    pub user_id: Uuid,
    pub whoop_user_id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub token_expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WhoopLink {
    pub fn is_token_fresh(&self, now: DateTime<Utc>, skew_secs: i64) -> bool {
        self.token_expires_at - now > chrono::Duration::seconds(skew_secs)
    }
}

/// Short-lived PKCE state row, consumed at callback (§4.C).
#[derive(Debug, Clone)]
pub struct OAuthPending {
    pub user_id: Uuid,
    pub state: String,
    pub code_verifier: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OAuthPending {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoveryRecord {
    pub id: String,
    pub user_id: Uuid,
    pub cycle_id: i64,
    pub recovery_score: i32,
    pub hrv_rmssd_milli: f64,
    pub resting_heart_rate: i32,
    pub spo2_percentage: Option<f64>,
    pub skin_temp_celsius: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub raw: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SleepRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_sleep_time_milli: i64,
    pub rem_sleep_time_milli: i64,
    pub slow_wave_sleep_time_milli: i64,
    pub light_sleep_time_milli: i64,
    pub awake_time_milli: i64,
    pub sleep_performance_percentage: Option<f64>,
    pub sleep_consistency_percentage: Option<f64>,
    pub sleep_efficiency_percentage: Option<f64>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub cycle_id: i64,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub strain: f64,
    pub average_heart_rate: i32,
    pub max_heart_rate: i32,
    pub kilojoules: f64,
    pub distance_meters: Option<f64>,
    pub sport_id: i32,
    pub sport_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_milli: i64,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub id: String,
    pub user_id: Uuid,
    pub strain: f64,
    pub kilojoules: f64,
    pub average_heart_rate: i32,
    pub max_heart_rate: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncLogEntry {
    pub user_id: Uuid,
    pub data_type: DataType,
    pub last_sync_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub records_synced: i64,
    pub error_message: Option<String>,
}

//! Repository (§4.E): idempotent upsert, indexed reads, sync-log maintenance.
//!
//! Every query is scoped by `user_id` so row-level isolation is enforced in
//! one place rather than trusted to each caller.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    CycleRecord, DataType, RecoveryRecord, SleepRecord, SyncLogEntry, SyncStatus, WhoopLink,
    WorkoutRecord,
};

pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        let statements = [
            r"CREATE TABLE IF NOT EXISTS whoop_links (
                user_id TEXT PRIMARY KEY,
                whoop_user_id TEXT NOT NULL,
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                token_expires_at TEXT NOT NULL,
                scopes TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            r"CREATE TABLE IF NOT EXISTS oauth_pending (
                state TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                code_verifier TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
            r"CREATE TABLE IF NOT EXISTS recovery_records (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                cycle_id INTEGER NOT NULL,
                recovery_score INTEGER NOT NULL,
                hrv_rmssd_milli REAL NOT NULL,
                resting_heart_rate INTEGER NOT NULL,
                spo2_percentage REAL,
                skin_temp_celsius REAL,
                created_at TEXT NOT NULL,
                raw TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                synced_at TEXT NOT NULL
            )",
            r"CREATE INDEX IF NOT EXISTS idx_recovery_user ON recovery_records(user_id, created_at)",
            r"CREATE TABLE IF NOT EXISTS sleep_records (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                total_sleep_time_milli INTEGER NOT NULL,
                rem_sleep_time_milli INTEGER NOT NULL,
                slow_wave_sleep_time_milli INTEGER NOT NULL,
                light_sleep_time_milli INTEGER NOT NULL,
                awake_time_milli INTEGER NOT NULL,
                sleep_performance_percentage REAL,
                sleep_consistency_percentage REAL,
                sleep_efficiency_percentage REAL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                cycle_id INTEGER NOT NULL,
                raw TEXT NOT NULL
            )",
            r"CREATE INDEX IF NOT EXISTS idx_sleep_user ON sleep_records(user_id, end_time)",
            r"CREATE TABLE IF NOT EXISTS workout_records (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                strain REAL NOT NULL,
                average_heart_rate INTEGER NOT NULL,
                max_heart_rate INTEGER NOT NULL,
                kilojoules REAL NOT NULL,
                distance_meters REAL,
                sport_id INTEGER NOT NULL,
                sport_name TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                duration_milli INTEGER NOT NULL,
                raw TEXT NOT NULL
            )",
            r"CREATE INDEX IF NOT EXISTS idx_workout_user ON workout_records(user_id, start_time)",
            r"CREATE TABLE IF NOT EXISTS cycle_records (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                strain REAL NOT NULL,
                kilojoules REAL NOT NULL,
                average_heart_rate INTEGER NOT NULL,
                max_heart_rate INTEGER NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                raw TEXT NOT NULL
            )",
            r"CREATE INDEX IF NOT EXISTS idx_cycle_user ON cycle_records(user_id, start_time)",
            r"CREATE TABLE IF NOT EXISTS sync_log (
                user_id TEXT NOT NULL,
                data_type TEXT NOT NULL,
                last_sync_at TEXT NOT NULL,
                sync_status TEXT NOT NULL,
                records_synced INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                PRIMARY KEY (user_id, data_type)
            )",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(AppError::repository)?;
        }

        Ok(())
    }

    // ---- WhoopLink -------------------------------------------------

    pub async fn upsert_link(
        &self,
        user_id: Uuid,
        whoop_user_id: &str,
        access_token: &str,
        refresh_token: &str,
        token_expires_at: DateTime<Utc>,
        scopes: &[String],
    ) -> Result<(), AppError> {
        let now = Utc::now();
        sqlx::query(
            r"INSERT INTO whoop_links
                (user_id, whoop_user_id, access_token, refresh_token, token_expires_at, scopes, is_active, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
              ON CONFLICT(user_id) DO UPDATE SET
                whoop_user_id = excluded.whoop_user_id,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_expires_at = excluded.token_expires_at,
                scopes = excluded.scopes,
                is_active = 1,
                updated_at = excluded.updated_at",
        )
        .bind(user_id.to_string())
        .bind(whoop_user_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(token_expires_at.to_rfc3339())
        .bind(scopes.join(","))
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(AppError::repository)?;

        Ok(())
    }

    pub async fn get_link(&self, user_id: Uuid) -> Result<Option<WhoopLink>, AppError> {
        let row = sqlx::query(
            "SELECT user_id, whoop_user_id, access_token, refresh_token, token_expires_at, scopes, is_active, created_at, updated_at
             FROM whoop_links WHERE user_id = ?",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::repository)?;

        row.map(row_to_link).transpose()
    }

    pub async fn deactivate_link(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE whoop_links SET is_active = 0, updated_at = ? WHERE user_id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(AppError::repository)?;
        Ok(())
    }

    // ---- OAuthPending ------------------------------------------------

    pub async fn insert_pending(
        &self,
        user_id: Uuid,
        state: &str,
        code_verifier: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO oauth_pending (state, user_id, code_verifier, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(state)
        .bind(user_id.to_string())
        .bind(code_verifier)
        .bind(Utc::now().to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(AppError::repository)?;
        Ok(())
    }

    /// Atomically reads and deletes the pending row for `state`, so two
    /// concurrent callbacks with the same state cannot both succeed (§4.C).
    pub async fn consume_pending(
        &self,
        state: &str,
    ) -> Result<Option<(Uuid, String, DateTime<Utc>)>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::repository)?;

        let row = sqlx::query(
            "SELECT user_id, code_verifier, expires_at FROM oauth_pending WHERE state = ?",
        )
        .bind(state)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::repository)?;

        let Some(row) = row else {
            tx.rollback().await.map_err(AppError::repository)?;
            return Ok(None);
        };

        let deleted = sqlx::query("DELETE FROM oauth_pending WHERE state = ?")
            .bind(state)
            .execute(&mut *tx)
            .await
            .map_err(AppError::repository)?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await.map_err(AppError::repository)?;
            return Ok(None);
        }

        tx.commit().await.map_err(AppError::repository)?;

        let user_id: String = row.try_get("user_id").map_err(AppError::repository)?;
        let code_verifier: String = row.try_get("code_verifier").map_err(AppError::repository)?;
        let expires_at: String = row.try_get("expires_at").map_err(AppError::repository)?;

        Ok(Some((
            Uuid::parse_str(&user_id).map_err(AppError::repository)?,
            code_verifier,
            parse_timestamp(&expires_at)?,
        )))
    }

    // ---- Domain record upserts ---------------------------------------

    pub async fn upsert_recovery(&self, record: &RecoveryRecord) -> Result<(), AppError> {
        sqlx::query(
            r"INSERT INTO recovery_records
                (id, user_id, cycle_id, recovery_score, hrv_rmssd_milli, resting_heart_rate, spo2_percentage, skin_temp_celsius, created_at, raw, fetched_at, synced_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
              ON CONFLICT(id) DO UPDATE SET
                cycle_id = excluded.cycle_id,
                recovery_score = excluded.recovery_score,
                hrv_rmssd_milli = excluded.hrv_rmssd_milli,
                resting_heart_rate = excluded.resting_heart_rate,
                spo2_percentage = excluded.spo2_percentage,
                skin_temp_celsius = excluded.skin_temp_celsius,
                raw = excluded.raw,
                fetched_at = excluded.fetched_at,
                synced_at = excluded.synced_at",
        )
        .bind(&record.id)
        .bind(record.user_id.to_string())
        .bind(record.cycle_id)
        .bind(record.recovery_score)
        .bind(record.hrv_rmssd_milli)
        .bind(record.resting_heart_rate)
        .bind(record.spo2_percentage)
        .bind(record.skin_temp_celsius)
        .bind(record.created_at.to_rfc3339())
        .bind(record.raw.to_string())
        .bind(record.fetched_at.to_rfc3339())
        .bind(record.synced_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(AppError::repository)?;
        Ok(())
    }

    pub async fn upsert_sleep(&self, record: &SleepRecord) -> Result<(), AppError> {
        sqlx::query(
            r"INSERT INTO sleep_records
                (id, user_id, total_sleep_time_milli, rem_sleep_time_milli, slow_wave_sleep_time_milli, light_sleep_time_milli, awake_time_milli, sleep_performance_percentage, sleep_consistency_percentage, sleep_efficiency_percentage, start_time, end_time, cycle_id, raw)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
              ON CONFLICT(id) DO UPDATE SET
                total_sleep_time_milli = excluded.total_sleep_time_milli,
                rem_sleep_time_milli = excluded.rem_sleep_time_milli,
                slow_wave_sleep_time_milli = excluded.slow_wave_sleep_time_milli,
                light_sleep_time_milli = excluded.light_sleep_time_milli,
                awake_time_milli = excluded.awake_time_milli,
                sleep_performance_percentage = excluded.sleep_performance_percentage,
                sleep_consistency_percentage = excluded.sleep_consistency_percentage,
                sleep_efficiency_percentage = excluded.sleep_efficiency_percentage,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                cycle_id = excluded.cycle_id,
                raw = excluded.raw",
        )
        .bind(record.id.to_string())
        .bind(record.user_id.to_string())
        .bind(record.total_sleep_time_milli)
        .bind(record.rem_sleep_time_milli)
        .bind(record.slow_wave_sleep_time_milli)
        .bind(record.light_sleep_time_milli)
        .bind(record.awake_time_milli)
        .bind(record.sleep_performance_percentage)
        .bind(record.sleep_consistency_percentage)
        .bind(record.sleep_efficiency_percentage)
        .bind(record.start_time.to_rfc3339())
        .bind(record.end_time.to_rfc3339())
        .bind(record.cycle_id)
        .bind(record.raw.to_string())
        .execute(&self.pool)
        .await
        .map_err(AppError::repository)?;
        Ok(())
    }

    pub async fn upsert_workout(&self, record: &WorkoutRecord) -> Result<(), AppError> {
        sqlx::query(
            r"INSERT INTO workout_records
                (id, user_id, strain, average_heart_rate, max_heart_rate, kilojoules, distance_meters, sport_id, sport_name, start_time, end_time, duration_milli, raw)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
              ON CONFLICT(id) DO UPDATE SET
                strain = excluded.strain,
                average_heart_rate = excluded.average_heart_rate,
                max_heart_rate = excluded.max_heart_rate,
                kilojoules = excluded.kilojoules,
                distance_meters = excluded.distance_meters,
                sport_id = excluded.sport_id,
                sport_name = excluded.sport_name,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                duration_milli = excluded.duration_milli,
                raw = excluded.raw",
        )
        .bind(record.id.to_string())
        .bind(record.user_id.to_string())
        .bind(record.strain)
        .bind(record.average_heart_rate)
        .bind(record.max_heart_rate)
        .bind(record.kilojoules)
        .bind(record.distance_meters)
        .bind(record.sport_id)
        .bind(&record.sport_name)
        .bind(record.start_time.to_rfc3339())
        .bind(record.end_time.to_rfc3339())
        .bind(record.duration_milli)
        .bind(record.raw.to_string())
        .execute(&self.pool)
        .await
        .map_err(AppError::repository)?;
        Ok(())
    }

    pub async fn upsert_cycle(&self, record: &CycleRecord) -> Result<(), AppError> {
        sqlx::query(
            r"INSERT INTO cycle_records
                (id, user_id, strain, kilojoules, average_heart_rate, max_heart_rate, start_time, end_time, raw)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
              ON CONFLICT(id) DO UPDATE SET
                strain = excluded.strain,
                kilojoules = excluded.kilojoules,
                average_heart_rate = excluded.average_heart_rate,
                max_heart_rate = excluded.max_heart_rate,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                raw = excluded.raw",
        )
        .bind(&record.id)
        .bind(record.user_id.to_string())
        .bind(record.strain)
        .bind(record.kilojoules)
        .bind(record.average_heart_rate)
        .bind(record.max_heart_rate)
        .bind(record.start_time.to_rfc3339())
        .bind(record.end_time.map(|t| t.to_rfc3339()))
        .bind(record.raw.to_string())
        .execute(&self.pool)
        .await
        .map_err(AppError::repository)?;
        Ok(())
    }

    // ---- Reads ---------------------------------------------------------

    pub async fn read_recent_recovery(&self, user_id: Uuid, limit: u32) -> Result<Vec<RecoveryRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, cycle_id, recovery_score, hrv_rmssd_milli, resting_heart_rate, spo2_percentage, skin_temp_celsius, created_at, raw, fetched_at, synced_at
             FROM recovery_records WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::repository)?;

        rows.into_iter().map(row_to_recovery).collect()
    }

    pub async fn read_daily_recovery(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<RecoveryRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, cycle_id, recovery_score, hrv_rmssd_milli, resting_heart_rate, spo2_percentage, skin_temp_celsius, created_at, raw, fetched_at, synced_at
             FROM recovery_records WHERE user_id = ? AND substr(created_at, 1, 10) = ?",
        )
        .bind(user_id.to_string())
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::repository)?;

        rows.into_iter().map(row_to_recovery).collect()
    }

    pub async fn read_recent_sleep(&self, user_id: Uuid, limit: u32) -> Result<Vec<SleepRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, total_sleep_time_milli, rem_sleep_time_milli, slow_wave_sleep_time_milli, light_sleep_time_milli, awake_time_milli, sleep_performance_percentage, sleep_consistency_percentage, sleep_efficiency_percentage, start_time, end_time, cycle_id, raw
             FROM sleep_records WHERE user_id = ? ORDER BY end_time DESC LIMIT ?",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::repository)?;

        rows.into_iter().map(row_to_sleep).collect()
    }

    pub async fn read_daily_sleep(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<SleepRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, total_sleep_time_milli, rem_sleep_time_milli, slow_wave_sleep_time_milli, light_sleep_time_milli, awake_time_milli, sleep_performance_percentage, sleep_consistency_percentage, sleep_efficiency_percentage, start_time, end_time, cycle_id, raw
             FROM sleep_records WHERE user_id = ? AND substr(end_time, 1, 10) = ?",
        )
        .bind(user_id.to_string())
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::repository)?;

        rows.into_iter().map(row_to_sleep).collect()
    }

    pub async fn read_recent_workout(&self, user_id: Uuid, limit: u32) -> Result<Vec<WorkoutRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, strain, average_heart_rate, max_heart_rate, kilojoules, distance_meters, sport_id, sport_name, start_time, end_time, duration_milli, raw
             FROM workout_records WHERE user_id = ? ORDER BY start_time DESC LIMIT ?",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::repository)?;

        rows.into_iter().map(row_to_workout).collect()
    }

    pub async fn read_daily_workout(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<WorkoutRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, strain, average_heart_rate, max_heart_rate, kilojoules, distance_meters, sport_id, sport_name, start_time, end_time, duration_milli, raw
             FROM workout_records WHERE user_id = ? AND substr(start_time, 1, 10) = ?",
        )
        .bind(user_id.to_string())
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::repository)?;

        rows.into_iter().map(row_to_workout).collect()
    }

    pub async fn read_recent_cycle(&self, user_id: Uuid, limit: u32) -> Result<Vec<CycleRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, strain, kilojoules, average_heart_rate, max_heart_rate, start_time, end_time, raw
             FROM cycle_records WHERE user_id = ? ORDER BY start_time DESC LIMIT ?",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::repository)?;

        rows.into_iter().map(row_to_cycle).collect()
    }

    pub async fn read_daily_cycle(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<CycleRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, strain, kilojoules, average_heart_rate, max_heart_rate, start_time, end_time, raw
             FROM cycle_records WHERE user_id = ? AND substr(start_time, 1, 10) = ?",
        )
        .bind(user_id.to_string())
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::repository)?;

        rows.into_iter().map(row_to_cycle).collect()
    }

    // ---- Sync log -------------------------------------------------------

    pub async fn get_sync_entry(&self, user_id: Uuid, data_type: DataType) -> Result<Option<SyncLogEntry>, AppError> {
        let row = sqlx::query(
            "SELECT user_id, data_type, last_sync_at, sync_status, records_synced, error_message
             FROM sync_log WHERE user_id = ? AND data_type = ?",
        )
        .bind(user_id.to_string())
        .bind(data_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::repository)?;

        row.map(row_to_sync_entry).transpose()
    }

    pub async fn update_sync_entry(
        &self,
        user_id: Uuid,
        data_type: DataType,
        records_synced_delta: i64,
        status: SyncStatus,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r"INSERT INTO sync_log (user_id, data_type, last_sync_at, sync_status, records_synced, error_message)
              VALUES (?, ?, ?, ?, ?, ?)
              ON CONFLICT(user_id, data_type) DO UPDATE SET
                last_sync_at = excluded.last_sync_at,
                sync_status = excluded.sync_status,
                records_synced = records_synced + excluded.records_synced,
                error_message = excluded.error_message",
        )
        .bind(user_id.to_string())
        .bind(data_type.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(status.as_str())
        .bind(records_synced_delta)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(AppError::repository)?;

        Ok(())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(AppError::repository)
}

fn row_to_link(row: sqlx::sqlite::SqliteRow) -> Result<WhoopLink, AppError> {
    let user_id: String = row.try_get("user_id").map_err(AppError::repository)?;
    let token_expires_at: String = row.try_get("token_expires_at").map_err(AppError::repository)?;
    let scopes: String = row.try_get("scopes").map_err(AppError::repository)?;
    let created_at: String = row.try_get("created_at").map_err(AppError::repository)?;
    let updated_at: String = row.try_get("updated_at").map_err(AppError::repository)?;

    Ok(WhoopLink {
        user_id: Uuid::parse_str(&user_id).map_err(AppError::repository)?,
        whoop_user_id: row.try_get("whoop_user_id").map_err(AppError::repository)?,
        access_token: row.try_get("access_token").map_err(AppError::repository)?,
        refresh_token: row.try_get("refresh_token").map_err(AppError::repository)?,
        token_expires_at: parse_timestamp(&token_expires_at)?,
        scopes: scopes.split(',').filter(|s| !s.is_empty()).map(String::from).collect(),
        is_active: row.try_get::<i64, _>("is_active").map_err(AppError::repository)? != 0,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn row_to_recovery(row: sqlx::sqlite::SqliteRow) -> Result<RecoveryRecord, AppError> {
    let user_id: String = row.try_get("user_id").map_err(AppError::repository)?;
    let created_at: String = row.try_get("created_at").map_err(AppError::repository)?;
    let raw: String = row.try_get("raw").map_err(AppError::repository)?;
    let fetched_at: String = row.try_get("fetched_at").map_err(AppError::repository)?;
    let synced_at: String = row.try_get("synced_at").map_err(AppError::repository)?;

    Ok(RecoveryRecord {
        id: row.try_get("id").map_err(AppError::repository)?,
        user_id: Uuid::parse_str(&user_id).map_err(AppError::repository)?,
        cycle_id: row.try_get("cycle_id").map_err(AppError::repository)?,
        recovery_score: row.try_get("recovery_score").map_err(AppError::repository)?,
        hrv_rmssd_milli: row.try_get("hrv_rmssd_milli").map_err(AppError::repository)?,
        resting_heart_rate: row.try_get("resting_heart_rate").map_err(AppError::repository)?,
        spo2_percentage: row.try_get("spo2_percentage").map_err(AppError::repository)?,
        skin_temp_celsius: row.try_get("skin_temp_celsius").map_err(AppError::repository)?,
        created_at: parse_timestamp(&created_at)?,
        raw: serde_json::from_str(&raw).unwrap_or(Value::Null),
        fetched_at: parse_timestamp(&fetched_at)?,
        synced_at: parse_timestamp(&synced_at)?,
    })
}

fn row_to_sleep(row: sqlx::sqlite::SqliteRow) -> Result<SleepRecord, AppError> {
    let id: String = row.try_get("id").map_err(AppError::repository)?;
    let user_id: String = row.try_get("user_id").map_err(AppError::repository)?;
    let start_time: String = row.try_get("start_time").map_err(AppError::repository)?;
    let end_time: String = row.try_get("end_time").map_err(AppError::repository)?;
    let raw: String = row.try_get("raw").map_err(AppError::repository)?;

    Ok(SleepRecord {
        id: Uuid::parse_str(&id).map_err(AppError::repository)?,
        user_id: Uuid::parse_str(&user_id).map_err(AppError::repository)?,
        total_sleep_time_milli: row.try_get("total_sleep_time_milli").map_err(AppError::repository)?,
        rem_sleep_time_milli: row.try_get("rem_sleep_time_milli").map_err(AppError::repository)?,
        slow_wave_sleep_time_milli: row.try_get("slow_wave_sleep_time_milli").map_err(AppError::repository)?,
        light_sleep_time_milli: row.try_get("light_sleep_time_milli").map_err(AppError::repository)?,
        awake_time_milli: row.try_get("awake_time_milli").map_err(AppError::repository)?,
        sleep_performance_percentage: row.try_get("sleep_performance_percentage").map_err(AppError::repository)?,
        sleep_consistency_percentage: row.try_get("sleep_consistency_percentage").map_err(AppError::repository)?,
        sleep_efficiency_percentage: row.try_get("sleep_efficiency_percentage").map_err(AppError::repository)?,
        start_time: parse_timestamp(&start_time)?,
        end_time: parse_timestamp(&end_time)?,
        cycle_id: row.try_get("cycle_id").map_err(AppError::repository)?,
        raw: serde_json::from_str(&raw).unwrap_or(Value::Null),
    })
}

fn row_to_workout(row: sqlx::sqlite::SqliteRow) -> Result<WorkoutRecord, AppError> {
    let id: String = row.try_get("id").map_err(AppError::repository)?;
    let user_id: String = row.try_get("user_id").map_err(AppError::repository)?;
    let start_time: String = row.try_get("start_time").map_err(AppError::repository)?;
    let end_time: String = row.try_get("end_time").map_err(AppError::repository)?;
    let raw: String = row.try_get("raw").map_err(AppError::repository)?;

    Ok(WorkoutRecord {
        id: Uuid::parse_str(&id).map_err(AppError::repository)?,
        user_id: Uuid::parse_str(&user_id).map_err(AppError::repository)?,
        strain: row.try_get("strain").map_err(AppError::repository)?,
        average_heart_rate: row.try_get("average_heart_rate").map_err(AppError::repository)?,
        max_heart_rate: row.try_get("max_heart_rate").map_err(AppError::repository)?,
        kilojoules: row.try_get("kilojoules").map_err(AppError::repository)?,
        distance_meters: row.try_get("distance_meters").map_err(AppError::repository)?,
        sport_id: row.try_get("sport_id").map_err(AppError::repository)?,
        sport_name: row.try_get("sport_name").map_err(AppError::repository)?,
        start_time: parse_timestamp(&start_time)?,
        end_time: parse_timestamp(&end_time)?,
        duration_milli: row.try_get("duration_milli").map_err(AppError::repository)?,
        raw: serde_json::from_str(&raw).unwrap_or(Value::Null),
    })
}

fn row_to_cycle(row: sqlx::sqlite::SqliteRow) -> Result<CycleRecord, AppError> {
    let user_id: String = row.try_get("user_id").map_err(AppError::repository)?;
    let start_time: String = row.try_get("start_time").map_err(AppError::repository)?;
    let end_time: Option<String> = row.try_get("end_time").map_err(AppError::repository)?;
    let raw: String = row.try_get("raw").map_err(AppError::repository)?;

    Ok(CycleRecord {
        id: row.try_get("id").map_err(AppError::repository)?,
        user_id: Uuid::parse_str(&user_id).map_err(AppError::repository)?,
        strain: row.try_get("strain").map_err(AppError::repository)?,
        kilojoules: row.try_get("kilojoules").map_err(AppError::repository)?,
        average_heart_rate: row.try_get("average_heart_rate").map_err(AppError::repository)?,
        max_heart_rate: row.try_get("max_heart_rate").map_err(AppError::repository)?,
        start_time: parse_timestamp(&start_time)?,
        end_time: end_time.map(|t| parse_timestamp(&t)).transpose()?,
        raw: serde_json::from_str(&raw).unwrap_or(Value::Null),
    })
}

fn row_to_sync_entry(row: sqlx::sqlite::SqliteRow) -> Result<SyncLogEntry, AppError> {
    let user_id: String = row.try_get("user_id").map_err(AppError::repository)?;
    let data_type: String = row.try_get("data_type").map_err(AppError::repository)?;
    let last_sync_at: String = row.try_get("last_sync_at").map_err(AppError::repository)?;
    let sync_status: String = row.try_get("sync_status").map_err(AppError::repository)?;

    Ok(SyncLogEntry {
        user_id: Uuid::parse_str(&user_id).map_err(AppError::repository)?,
        data_type: DataType::parse(&data_type).ok_or_else(|| AppError::repository("unknown data_type in sync_log"))?,
        last_sync_at: parse_timestamp(&last_sync_at)?,
        sync_status: SyncStatus::parse(&sync_status),
        records_synced: row.try_get("records_synced").map_err(AppError::repository)?,
        error_message: row.try_get("error_message").map_err(AppError::repository)?,
    })
}

//! Normalizer (§4.D): raw upstream JSON → typed domain records.
//!
//! Records failing validation are dropped and counted, never propagated as
//! an error — a single bad row must not abort an otherwise-good sync.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{CycleRecord, RecoveryRecord, SleepRecord, WorkoutRecord};

fn parse_time(value: &Value, field: &str) -> Option<DateTime<Utc>> {
    value
        .get(field)?
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn coerce_int(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        Some(i)
    } else {
        value.as_f64().map(|f| f.round() as i64)
    }
}

/// Recovery has no top-level `id` — its primary key is the sleep session it
/// attaches to. This is the deliberate, spec-resolved divergence from
/// extracting recovery out of the cycle endpoint's embedded score.
pub fn normalize_recovery(raw: &Value, user_id: Uuid, fetched_at: DateTime<Utc>) -> Option<RecoveryRecord> {
    let id = raw.get("sleep_id")?.as_str()?.to_string();
    let cycle_id = coerce_int(raw.get("cycle_id")?)?;
    let score = raw.get("score")?;

    let recovery_score = coerce_int(score.get("recovery_score")?)? as i32;
    let hrv_rmssd_milli = score.get("hrv_rmssd_milli")?.as_f64()?;
    let resting_heart_rate = coerce_int(score.get("resting_heart_rate")?)? as i32;
    let spo2_percentage = score.get("spo2_percentage").and_then(Value::as_f64);
    let skin_temp_celsius = score.get("skin_temp_celsius").and_then(Value::as_f64);

    if !(0..=100).contains(&recovery_score) {
        return None;
    }

    let created_at = parse_time(raw, "created_at").unwrap_or(fetched_at);

    Some(RecoveryRecord {
        id,
        user_id,
        cycle_id,
        recovery_score,
        hrv_rmssd_milli,
        resting_heart_rate,
        spo2_percentage,
        skin_temp_celsius,
        created_at,
        raw: raw.clone(),
        fetched_at,
        synced_at: fetched_at,
    })
}

pub fn normalize_sleep(raw: &Value, user_id: Uuid) -> Option<SleepRecord> {
    let id = Uuid::parse_str(raw.get("id")?.as_str()?).ok()?;
    let start_time = parse_time(raw, "start")?;
    let end_time = parse_time(raw, "end")?;
    if end_time <= start_time {
        return None;
    }
    let cycle_id = coerce_int(raw.get("cycle_id")?)?;
    let score = raw.get("score")?;

    Some(SleepRecord {
        id,
        user_id,
        total_sleep_time_milli: coerce_int(score.get("total_in_bed_time_milli")?)?,
        rem_sleep_time_milli: coerce_int(score.get("total_rem_sleep_time_milli")?)?,
        slow_wave_sleep_time_milli: coerce_int(score.get("total_slow_wave_sleep_time_milli")?)?,
        light_sleep_time_milli: coerce_int(score.get("total_light_sleep_time_milli")?)?,
        awake_time_milli: coerce_int(score.get("total_awake_time_milli")?)?,
        sleep_performance_percentage: score.get("sleep_performance_percentage").and_then(Value::as_f64),
        sleep_consistency_percentage: score.get("sleep_consistency_percentage").and_then(Value::as_f64),
        sleep_efficiency_percentage: score.get("sleep_efficiency_percentage").and_then(Value::as_f64),
        start_time,
        end_time,
        cycle_id,
        raw: raw.clone(),
    })
}

pub fn normalize_workout(raw: &Value, user_id: Uuid) -> Option<WorkoutRecord> {
    let id = Uuid::parse_str(raw.get("id")?.as_str()?).ok()?;
    let start_time = parse_time(raw, "start")?;
    let end_time = parse_time(raw, "end")?;
    if end_time <= start_time {
        return None;
    }
    let score = raw.get("score")?;
    let strain = score.get("strain")?.as_f64()?;
    if !(0.0..=21.0).contains(&strain) {
        return None;
    }

    Some(WorkoutRecord {
        id,
        user_id,
        strain,
        average_heart_rate: coerce_int(score.get("average_heart_rate")?)? as i32,
        max_heart_rate: coerce_int(score.get("max_heart_rate")?)? as i32,
        kilojoules: score.get("kilojoule")?.as_f64()?,
        distance_meters: score.get("distance_meter").and_then(Value::as_f64),
        sport_id: coerce_int(raw.get("sport_id")?)? as i32,
        sport_name: raw
            .get("sport_name")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
        start_time,
        end_time,
        duration_milli: (end_time - start_time).num_milliseconds(),
        raw: raw.clone(),
    })
}

/// `end_time` may be absent for the currently in-progress cycle (§4.D).
pub fn normalize_cycle(raw: &Value, user_id: Uuid) -> Option<CycleRecord> {
    let id = raw.get("id")?.as_u64().map(|i| i.to_string()).or_else(|| raw.get("id")?.as_str().map(String::from))?;
    let start_time = parse_time(raw, "start")?;
    let end_time = parse_time(raw, "end");
    if let Some(end) = end_time {
        if end <= start_time {
            return None;
        }
    }
    let score = raw.get("score")?;

    Some(CycleRecord {
        id,
        user_id,
        strain: score.get("strain")?.as_f64()?,
        kilojoules: score.get("kilojoule")?.as_f64()?,
        average_heart_rate: coerce_int(score.get("average_heart_rate")?)? as i32,
        max_heart_rate: coerce_int(score.get("max_heart_rate")?)? as i32,
        start_time,
        end_time,
        raw: raw.clone(),
    })
}

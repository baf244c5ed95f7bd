use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use whoop_sync_engine::normalizer::{normalize_cycle, normalize_recovery, normalize_sleep, normalize_workout};

#[test]
fn recovery_uses_sleep_id_as_primary_key() {
    let user_id = Uuid::new_v4();
    let raw = json!({
        "sleep_id": "abc",
        "cycle_id": 42,
        "score": {
            "recovery_score": 77,
            "hrv_rmssd_milli": 45.2,
            "resting_heart_rate": 58.0,
        }
    });

    let record = normalize_recovery(&raw, user_id, Utc::now()).expect("valid recovery payload");

    assert_eq!(record.id, "abc");
    assert_eq!(record.cycle_id, 42);
    assert_eq!(record.recovery_score, 77);
    assert!((record.hrv_rmssd_milli - 45.2).abs() < f64::EPSILON);
    assert_eq!(record.resting_heart_rate, 58);
}

#[test]
fn recovery_missing_sleep_id_is_dropped_not_errored() {
    let raw = json!({ "cycle_id": 42, "score": { "recovery_score": 77 } });
    assert!(normalize_recovery(&raw, Uuid::new_v4(), Utc::now()).is_none());
}

#[test]
fn recovery_out_of_range_score_is_dropped() {
    let raw = json!({
        "sleep_id": "abc",
        "cycle_id": 1,
        "score": { "recovery_score": 150, "hrv_rmssd_milli": 1.0, "resting_heart_rate": 50 }
    });
    assert!(normalize_recovery(&raw, Uuid::new_v4(), Utc::now()).is_none());
}

#[test]
fn sleep_rejects_end_before_start() {
    let raw = json!({
        "id": Uuid::new_v4().to_string(),
        "cycle_id": 1,
        "start": "2026-01-01T10:00:00Z",
        "end": "2026-01-01T09:00:00Z",
        "score": {
            "total_in_bed_time_milli": 1,
            "total_rem_sleep_time_milli": 1,
            "total_slow_wave_sleep_time_milli": 1,
            "total_light_sleep_time_milli": 1,
            "total_awake_time_milli": 1,
        }
    });
    assert!(normalize_sleep(&raw, Uuid::new_v4()).is_none());
}

#[test]
fn sleep_coerces_decimal_millis_to_integer() {
    let raw = json!({
        "id": Uuid::new_v4().to_string(),
        "cycle_id": 7,
        "start": "2026-01-01T01:00:00Z",
        "end": "2026-01-01T09:00:00Z",
        "score": {
            "total_in_bed_time_milli": 28_800_000.0,
            "total_rem_sleep_time_milli": 5_000_000,
            "total_slow_wave_sleep_time_milli": 4_000_000,
            "total_light_sleep_time_milli": 10_000_000,
            "total_awake_time_milli": 600_000,
        }
    });
    let record = normalize_sleep(&raw, Uuid::new_v4()).expect("valid sleep payload");
    assert_eq!(record.total_sleep_time_milli, 28_800_000);
}

#[test]
fn workout_rejects_strain_out_of_range() {
    let raw = json!({
        "id": Uuid::new_v4().to_string(),
        "start": "2026-01-01T10:00:00Z",
        "end": "2026-01-01T11:00:00Z",
        "sport_id": 1,
        "sport_name": "running",
        "score": {
            "strain": 25.0,
            "average_heart_rate": 140,
            "max_heart_rate": 180,
            "kilojoule": 500.0,
        }
    });
    assert!(normalize_workout(&raw, Uuid::new_v4()).is_none());
}

#[test]
fn cycle_accepts_null_end_time_for_in_progress_cycle() {
    let raw = json!({
        "id": 12345,
        "start": "2026-01-01T00:00:00Z",
        "score": {
            "strain": 10.5,
            "kilojoule": 800.0,
            "average_heart_rate": 70,
            "max_heart_rate": 150,
        }
    });
    let record = normalize_cycle(&raw, Uuid::new_v4()).expect("in-progress cycle is still valid");
    assert_eq!(record.id, "12345");
    assert!(record.end_time.is_none());
}

#[test]
fn cycle_rejects_end_before_start_when_present() {
    let raw = json!({
        "id": "1",
        "start": "2026-01-01T10:00:00Z",
        "end": "2026-01-01T09:00:00Z",
        "score": { "strain": 1.0, "kilojoule": 1.0, "average_heart_rate": 60, "max_heart_rate": 100 }
    });
    assert!(normalize_cycle(&raw, Uuid::new_v4()).is_none());
}

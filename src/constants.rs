//! Fixed string/numeric constants shared across the engine.

/// Base URL for WHOOP's developer API. The path carries `v1` despite the
/// API having moved past its first revision; this is upstream's own naming,
/// not ours.
pub const UPSTREAM_BASE_URL: &str = "https://api.prod.whoop.com/developer/v1/";

pub const RECOVERY_PATH: &str = "recovery";
pub const SLEEP_PATH: &str = "activity/sleep";
pub const WORKOUT_PATH: &str = "activity/workout";
pub const CYCLE_PATH: &str = "cycle";

pub const TOKEN_ENDPOINT_PATH: &str = "oauth/oauth2/token";
pub const AUTHORIZE_ENDPOINT_PATH: &str = "oauth/oauth2/auth";
pub const PROFILE_PATH: &str = "user/profile/basic";

pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 80;
pub const DEFAULT_RATE_LIMIT_PER_DAY: u32 = 8000;
pub const DEFAULT_INITIAL_BACKFILL_DAYS: i64 = 30;
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_OAUTH_STATE_TTL_SECONDS: i64 = 600;

pub const DEFAULT_FRESHNESS_RECOVERY_SECONDS: i64 = 2 * 3600;
pub const DEFAULT_FRESHNESS_SLEEP_SECONDS: i64 = 2 * 3600;
pub const DEFAULT_FRESHNESS_CYCLE_SECONDS: i64 = 2 * 3600;
pub const DEFAULT_FRESHNESS_WORKOUT_SECONDS: i64 = 3600;

/// Single-page record cap for recovery/sleep/cycle syncs (§4.F step 3).
pub const SINGLE_PAGE_LIMIT: u32 = 25;

/// Optional per-sync safety cap on workout pagination (§9 open question).
pub const WORKOUT_SYNC_RECORD_CAP: usize = 200;

/// Retry schedule for idempotent upstream GETs: 1s, 2s, 4s, then give up.
pub const RETRY_BACKOFF_SECONDS: [u64; 3] = [1, 2, 4];

/// Clock skew tolerated before a token is treated as expired.
pub const TOKEN_EXPIRY_SKEW_SECONDS: i64 = 60;

pub mod data_type {
    pub const RECOVERY: &str = "recovery";
    pub const SLEEP: &str = "sleep";
    pub const WORKOUT: &str = "workout";
    pub const CYCLE: &str = "cycle";
}

//! Environment-variable configuration loading (§6.4).

use std::env;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::constants;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    pub upstream_base_url: String,
    pub upstream_client_id: String,
    pub upstream_client_secret: String,
    pub upstream_redirect_uri: String,
    pub rate_limit_per_minute: u32,
    pub rate_limit_per_day: u32,
    pub freshness_recovery: Duration,
    pub freshness_sleep: Duration,
    pub freshness_cycle: Duration,
    pub freshness_workout: Duration,
    pub initial_backfill_days: i64,
    pub http_timeout: Duration,
    pub oauth_state_ttl: Duration,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            database_url: env_or("DATABASE_URL", "sqlite://whoop_sync.db"),
            upstream_base_url: env_or("UPSTREAM_BASE_URL", constants::UPSTREAM_BASE_URL),
            upstream_client_id: require_env("UPSTREAM_CLIENT_ID")?,
            upstream_client_secret: require_env("UPSTREAM_CLIENT_SECRET")?,
            upstream_redirect_uri: require_env("UPSTREAM_REDIRECT_URI")?,
            rate_limit_per_minute: env_parse_or(
                "RATE_LIMIT_PER_MINUTE",
                constants::DEFAULT_RATE_LIMIT_PER_MINUTE,
            ),
            rate_limit_per_day: env_parse_or(
                "RATE_LIMIT_PER_DAY",
                constants::DEFAULT_RATE_LIMIT_PER_DAY,
            ),
            freshness_recovery: Duration::from_secs(env_parse_or(
                "FRESHNESS_THRESHOLD_RECOVERY",
                constants::DEFAULT_FRESHNESS_RECOVERY_SECONDS as u64,
            )),
            freshness_sleep: Duration::from_secs(env_parse_or(
                "FRESHNESS_THRESHOLD_SLEEP",
                constants::DEFAULT_FRESHNESS_SLEEP_SECONDS as u64,
            )),
            freshness_cycle: Duration::from_secs(env_parse_or(
                "FRESHNESS_THRESHOLD_CYCLE",
                constants::DEFAULT_FRESHNESS_CYCLE_SECONDS as u64,
            )),
            freshness_workout: Duration::from_secs(env_parse_or(
                "FRESHNESS_THRESHOLD_WORKOUT",
                constants::DEFAULT_FRESHNESS_WORKOUT_SECONDS as u64,
            )),
            initial_backfill_days: env_parse_or(
                "INITIAL_BACKFILL_DAYS",
                constants::DEFAULT_INITIAL_BACKFILL_DAYS,
            ),
            http_timeout: Duration::from_secs(env_parse_or(
                "HTTP_TIMEOUT_SECONDS",
                constants::DEFAULT_HTTP_TIMEOUT_SECONDS,
            )),
            oauth_state_ttl: Duration::from_secs(env_parse_or(
                "OAUTH_STATE_TTL_SECONDS",
                constants::DEFAULT_OAUTH_STATE_TTL_SECONDS as u64,
            )),
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        config.validate_and_log();
        Ok(config)
    }

    fn validate_and_log(&self) {
        tracing::info!(
            upstream_base_url = %self.upstream_base_url,
            upstream_client_id_fingerprint = %secret_fingerprint(&self.upstream_client_id),
            upstream_client_secret_fingerprint = %secret_fingerprint(&self.upstream_client_secret),
            rate_limit_per_minute = self.rate_limit_per_minute,
            rate_limit_per_day = self.rate_limit_per_day,
            "engine configuration loaded",
        );
    }
}

/// First 8 hex chars of a SHA256 digest, safe to log alongside a secret's
/// identity without exposing the secret itself.
pub fn secret_fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    hex_prefix(&digest, 8)
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    bytes
        .iter()
        .flat_map(|b| [b >> 4, b & 0x0f])
        .take(chars)
        .map(|nibble| char::from_digit(u32::from(nibble), 16).unwrap_or('0'))
        .collect()
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn require_env(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("missing required environment variable {key}"))
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

//! Structured logging setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn,tower_http=info,hyper=warn";

/// Installs the global tracing subscriber. Call once at startup before any
/// other code runs.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_level(true))
            .init(),
    }
}

pub fn log_startup_info(bind_addr: &str) {
    tracing::info!(bind_addr, "whoop sync engine starting");
}

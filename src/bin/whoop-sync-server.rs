use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use whoop_sync_engine::config::EngineConfig;
use whoop_sync_engine::identity::OpaqueUuidVerifier;
use whoop_sync_engine::logging;
use whoop_sync_engine::resources::Resources;
use whoop_sync_engine::routes;

#[derive(Parser, Debug)]
#[command(name = "whoop-sync-server")]
struct Args {
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = EngineConfig::from_env()?;
    logging::init(config.log_format);
    logging::log_startup_info(&args.bind_addr);

    let identity = Arc::new(OpaqueUuidVerifier);
    let http_timeout = config.http_timeout;
    let resources = Resources::bootstrap(config, identity).await?;
    let app = routes::router(resources)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(http_timeout));

    let addr: SocketAddr = args.bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    display_available_endpoints(&args.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn display_available_endpoints(bind_addr: &str) {
    tracing::info!("listening on {bind_addr}");
    for route in [
        "POST /oauth/initiate",
        "GET  /oauth/callback",
        "DELETE /oauth/connection",
        "GET  /daily/:date",
        "GET  /data/:data_type",
        "POST /sync",
        "GET  /sync/status",
    ] {
        tracing::info!("  {route}");
    }
}

pub mod config;
pub mod constants;
pub mod errors;
pub mod http_client;
pub mod identity;
pub mod locks;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod oauth_http;
pub mod oauth_orchestrator;
pub mod pacer;
pub mod repository;
pub mod resources;
pub mod routes;
pub mod sync_orchestrator;
pub mod token_store;
pub mod whoop_client;

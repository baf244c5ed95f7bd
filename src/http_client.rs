//! Shared, differentiated-timeout HTTP clients.
//!
//! Mirrors the teacher's pattern of a small number of process-wide clients
//! tuned per call shape rather than one generic client with one timeout.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::Client;

static API_CLIENT: OnceLock<Client> = OnceLock::new();
static OAUTH_CLIENT: OnceLock<Client> = OnceLock::new();

/// Client for data-fetch calls (recovery/sleep/workout/cycle pages).
pub fn api_client(timeout: Duration) -> Client {
    API_CLIENT
        .get_or_init(|| build_client(timeout, Duration::from_secs(10)))
        .clone()
}

/// Client for token-endpoint exchanges; shorter connect timeout, these are
/// low-latency form posts to a single host.
pub fn oauth_client() -> Client {
    OAUTH_CLIENT
        .get_or_init(|| build_client(Duration::from_secs(15), Duration::from_secs(5)))
        .clone()
}

fn build_client(timeout: Duration, connect_timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

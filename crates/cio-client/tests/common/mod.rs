//! Shared helpers for the integration tests

#![allow(dead_code)]

use cio_client::{ApiClient, ApiConfig, SessionConfig, TrackClient, TrackConfig};
use std::sync::Once;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const SITE_ID: &str = "site";
pub const API_KEY: &str = "key";
/// base64("site:key")
pub const BASIC_AUTH: &str = "Basic c2l0ZTprZXk=";
pub const APP_KEY: &str = "app-key";

static INIT: Once = Once::new();

/// Route client logs to the test output; `RUST_LOG=cio_client=debug` to see them
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn session_config() -> SessionConfig {
    SessionConfig::default()
        .with_timeout(Duration::from_secs(5))
        .with_connect_timeout(Duration::from_secs(2))
}

pub fn track_client(base_url: &str) -> TrackClient {
    init_tracing();
    let config = TrackConfig::new(SITE_ID, API_KEY)
        .with_base_url(base_url)
        .with_session(session_config());
    TrackClient::new(config).unwrap()
}

pub fn api_client(base_url: &str) -> ApiClient {
    init_tracing();
    let config = ApiConfig::new(APP_KEY)
        .with_base_url(base_url)
        .with_session(session_config());
    ApiClient::new(config).unwrap()
}

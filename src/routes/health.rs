//! Liveness probe
//!
//! `/health` returns 200 while the process is running, along with the sizes
//! of the static tables loaded at start-up.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Seconds since start-up
    pub uptime: u64,
    pub timestamp: String,
    /// Number of network entries in the endpoint registry
    pub networks: usize,
    /// Number of gateways in the chain (primary + secondary)
    pub gateways: usize,
    pub unrecognized_pointer: String,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let config = state.resolver.config();
    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        networks: config.registry.len(),
        gateways: config.gateways.len(),
        unrecognized_pointer: config.unrecognized_pointer.to_string(),
    }
}

/// Handle `GET /health`
pub fn handle_health(state: &AppState) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(&build_health_response(state)).unwrap_or_default();

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-cache")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

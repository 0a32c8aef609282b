//! Health check endpoints
//!
//! - /health, /healthz - liveness probe (is the service running?)
//! - /ready, /readyz   - readiness probe (can MongoDB be reached?)
//! - /version          - build info for deployment verification
//!
//! Liveness always returns 200 while the process is up; the body carries the
//! database status so dashboards can show degraded state. Readiness returns
//! 503 until MongoDB answers a ping, which keeps load balancers from routing
//! traffic that would only see StoreUnavailable errors.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

/// Health payload for monitoring and the frontend's connectivity banner
#[derive(Serialize)]
pub struct HealthResponse {
    /// "ok" while the service runs, "degraded" when MongoDB is unreachable
    pub status: &'static str,
    /// Whether MongoDB answered a ping for this probe
    #[serde(rename = "dbConnected")]
    pub db_connected: bool,
    /// Service version
    pub version: &'static str,
    /// Seconds since process start
    pub uptime: u64,
    /// Current timestamp
    pub timestamp: String,
    /// Operating mode
    pub mode: String,
    /// Node identifier
    pub node_id: String,
}

async fn build_health_response(state: &AppState) -> HealthResponse {
    let db_connected = state.mongo.ping().await.is_ok();

    HealthResponse {
        status: if db_connected { "ok" } else { "degraded" },
        db_connected,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: state.args.node_id.to_string(),
    }
}

fn json_body<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(body)
        .unwrap_or_else(|_| r#"{"status":"error","message":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Handle liveness probe (/health, /healthz)
///
/// Returns 200 OK whenever the service is running; check `dbConnected` in
/// the body for storage health.
pub async fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state).await;
    json_body(StatusCode::OK, &response)
}

/// Handle readiness probe (/ready, /readyz)
///
/// Returns 200 only when MongoDB is reachable; submissions and leaderboard
/// reads would fail otherwise.
pub async fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state).await;

    let status = if response.db_connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    json_body(status, &response)
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    /// Service name
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "thinksecure-api",
    };

    json_body(StatusCode::OK, &response)
}

//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection. Correctness for
//! concurrent submissions comes from MongoDB's atomic document updates, so
//! the server needs no cross-request coordination and can run with any
//! number of instances behind a load balancer.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::challenges::{LeaderboardReader, MongoLedgerStore, ScoringEngine};
use crate::config::Args;
use crate::db::MongoClient;
use crate::routes;
use crate::types::ApiError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: MongoClient,
    /// Scoring engine over the ledger store
    pub scoring: ScoringEngine,
    /// Read-side leaderboard/progress projections over the same store
    pub leaderboard: LeaderboardReader,
    /// Process start, for the health endpoint's uptime field
    pub started: Instant,
}

impl AppState {
    /// Create application state over a connected MongoDB client.
    ///
    /// Opens the leaderboard collection (applying its indexes) and wires the
    /// scoring engine and leaderboard reader to one shared store handle.
    pub async fn new(args: Args, mongo: MongoClient) -> Result<Self, ApiError> {
        let store = Arc::new(MongoLedgerStore::new(&mongo).await?);

        Ok(Self {
            args,
            mongo,
            scoring: ScoringEngine::new(store.clone()),
            leaderboard: LeaderboardReader::new(store),
            started: Instant::now(),
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), ApiError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "ThinkSecure API listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - default JWT secret in use");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // Challenge routes (/challenges/*, /api/challenges/*) consume the request
    if let Some(response) = routes::handle_challenge_request(req, Arc::clone(&state)).await {
        return Ok(response);
    }

    let response = match (method.clone(), path.as_str()) {
        // Smoke-test route
        (Method::GET, "/") => root_response(),

        // Liveness probe - 200 whenever the process is up
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)).await)
        }

        // Readiness probe - 200 only when MongoDB responds
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            to_boxed(routes::readiness_check(Arc::clone(&state)).await)
        }

        // Version info for deployment verification
        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // CORS preflight
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        _ => {
            info!("404 - Route not found: {} {}", method, path);
            to_boxed(not_found_response(method.as_str(), &path))
        }
    };

    Ok(response)
}

fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

fn root_response() -> Response<BoxBody> {
    to_boxed(
        Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/plain")
            .header("Access-Control-Allow-Origin", "*")
            .body(Full::new(Bytes::from("Backend is running")))
            .unwrap(),
    )
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(method: &str, path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "message": "Route not found",
        "path": path,
        "method": method,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

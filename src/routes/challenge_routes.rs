//! HTTP routes for the challenge subsystem
//!
//! - POST /challenges/submit      - score a claimed solution (auth required)
//! - GET  /challenges/leaderboard - ranked top-N view (public)
//! - GET  /challenges/progress    - per-user statistics (auth required)
//!
//! The same routes are also served under /api/challenges/* because the
//! frontend reaches them through the /api prefix.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::auth::{extract_token_from_header, Claims, JwtValidator};
use crate::challenges::{validate, RankedEntry, SubmissionOutcome, SubmitRequest};
use crate::server::AppState;
use crate::types::ApiError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Generic message payload used for every error response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub points_earned: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_solved: Option<bool>,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<RankedEntry>,
    pub total: usize,
}

// =============================================================================
// Response Helpers
// =============================================================================

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

fn message_response(status: StatusCode, message: impl Into<String>) -> Response<BoxBody> {
    json_response(
        status,
        &MessageResponse {
            message: message.into(),
        },
    )
}

fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, ApiError> {
    let body = req
        .collect()
        .await
        .map_err(|e| ApiError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > 10240 {
        return Err(ApiError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes).map_err(|e| ApiError::Http(format!("Invalid JSON: {}", e)))
}

fn get_auth_header(req: &Request<hyper::body::Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

fn get_jwt_validator(state: &AppState) -> Result<JwtValidator, Response<BoxBody>> {
    if state.args.dev_mode {
        return Ok(JwtValidator::new_dev());
    }

    match &state.args.jwt_secret {
        Some(secret) => {
            JwtValidator::new(secret.clone(), state.args.jwt_expiry_seconds).map_err(|e| {
                warn!("JWT validator misconfigured: {}", e);
                message_response(StatusCode::INTERNAL_SERVER_ERROR, "Authentication error")
            })
        }
        None => {
            warn!("JWT_SECRET not configured");
            Err(message_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication error",
            ))
        }
    }
}

/// Resolve the request's bearer token to verified claims, or an error response
fn authenticate(
    req: &Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<Claims, Response<BoxBody>> {
    let token = match extract_token_from_header(get_auth_header(req)) {
        Some(t) => t,
        None => {
            return Err(message_response(
                StatusCode::UNAUTHORIZED,
                "Access token required",
            ))
        }
    };

    let jwt = get_jwt_validator(state)?;

    let result = jwt.verify_token(token);
    if !result.valid {
        return Err(message_response(
            StatusCode::UNAUTHORIZED,
            "Invalid or expired token",
        ));
    }

    result.claims.ok_or_else(|| {
        message_response(StatusCode::UNAUTHORIZED, "Invalid or expired token")
    })
}

/// Map a scoring/store failure to a client response, keeping detail in logs
fn failure_response(context: &str, err: ApiError) -> Response<BoxBody> {
    warn!("{}: {}", context, err);

    match err {
        ApiError::Database(_) => message_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Database error. Please try again.",
        ),
        _ => message_response(StatusCode::INTERNAL_SERVER_ERROR, "Server error"),
    }
}

/// Build the wire response for a submission outcome
fn submit_response(outcome: SubmissionOutcome, difficulty: &str) -> SubmitResponse {
    match outcome {
        SubmissionOutcome::Rejected => SubmitResponse {
            message: "Incorrect answer. Try again!".to_string(),
            points_earned: 0,
            total_score: None,
            difficulty: None,
            already_solved: None,
            success: false,
        },
        SubmissionOutcome::AlreadySolved { total_score } => SubmitResponse {
            message: "You've already solved this challenge!".to_string(),
            points_earned: 0,
            total_score: Some(total_score),
            difficulty: None,
            already_solved: Some(true),
            success: false,
        },
        SubmissionOutcome::Awarded {
            points_earned,
            total_score,
        } => SubmitResponse {
            message: format!("Correct! You earned {} points!", points_earned),
            points_earned,
            total_score: Some(total_score),
            difficulty: Some(difficulty.to_string()),
            already_solved: Some(false),
            success: true,
        },
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /challenges/submit
///
/// Validate a claimed solution and award points at most once per
/// `(challenge, category)` per user.
async fn handle_submit(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let body: SubmitRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return message_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e))
        }
    };

    let submission = match validate(&body) {
        Ok(s) => s,
        Err(e) => return message_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state
        .scoring
        .submit(&claims.id, &claims.username, &submission)
        .await
    {
        Ok(outcome) => json_response(
            StatusCode::OK,
            &submit_response(outcome, submission.difficulty.as_str()),
        ),
        Err(e) => failure_response("Challenge submission failed", e),
    }
}

/// GET /challenges/leaderboard
///
/// Public ranked view; ranks are computed per read, never stored.
async fn handle_leaderboard(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let limit = parse_limit(req.uri().query());

    match state.leaderboard.top(limit).await {
        Ok(leaderboard) => {
            let total = leaderboard.len();
            json_response(StatusCode::OK, &LeaderboardResponse { leaderboard, total })
        }
        Err(e) => failure_response("Leaderboard read failed", e),
    }
}

/// GET /challenges/progress
///
/// Per-user solve statistics, grouped by difficulty and category.
async fn handle_progress(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match state
        .leaderboard
        .progress(&claims.id, &claims.username)
        .await
    {
        Ok(progress) => json_response(StatusCode::OK, &progress),
        Err(e) => failure_response("Progress read failed", e),
    }
}

/// Parse the optional `limit` query parameter; invalid values are ignored
fn parse_limit(query: Option<&str>) -> Option<i64> {
    for param in query?.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            if key == "limit" {
                return value.parse().ok();
            }
        }
    }
    None
}

// =============================================================================
// Dispatch
// =============================================================================

/// Handle /challenges/* and /api/challenges/* requests.
/// Returns None for paths outside the challenge subsystem.
pub async fn handle_challenge_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let path = path.strip_prefix("/api").unwrap_or(path).to_string();

    if !path.starts_with("/challenges") {
        return None;
    }

    // Handle CORS preflight
    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let response = match (req.method(), path.as_str()) {
        (&Method::POST, "/challenges/submit") => handle_submit(req, state).await,
        (&Method::GET, "/challenges/leaderboard") => handle_leaderboard(req, state).await,
        (&Method::GET, "/challenges/progress") => handle_progress(req, state).await,

        // Method not allowed
        (_, "/challenges/submit")
        | (_, "/challenges/leaderboard")
        | (_, "/challenges/progress") => {
            message_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }

        // Challenge endpoint not found
        _ => message_response(StatusCode::NOT_FOUND, "Route not found"),
    };

    Some(response)
}

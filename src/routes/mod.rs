//! HTTP routes for the ThinkSecure API

pub mod challenge_routes;
pub mod health;

pub use challenge_routes::handle_challenge_request;
pub use health::{health_check, readiness_check, version_info};

//! Configuration for the ThinkSecure API
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// ThinkSecure API - leaderboard and challenge-submission backend
#[derive(Parser, Debug, Clone)]
#[command(name = "thinksecure-api")]
#[command(about = "Leaderboard scoring backend for the ThinkSecure platform")]
pub struct Args {
    /// Unique node identifier for this API instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGO_URI", default_value = "mongodb://localhost:27017")]
    pub mongo_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGO_DB", default_value = "thinksecure")]
    pub mongo_db: String,

    /// JWT secret for token verification (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (used when minting tokens; default 7 days)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "604800")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (allows a default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// MongoDB connection attempts before giving up at startup
    #[arg(long, env = "MONGO_CONNECT_RETRIES", default_value = "3")]
    pub mongo_connect_retries: u32,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.mongo_connect_retries == 0 {
            return Err("MONGO_CONNECT_RETRIES must be at least 1".to_string());
        }

        Ok(())
    }
}

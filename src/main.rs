//! ThinkSecure API - leaderboard and challenge-submission backend

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thinksecure_api::{config::Args, db::MongoClient, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("thinksecure_api={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  ThinkSecure API");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {} (db: {})", args.mongo_uri, args.mongo_db);
    info!("======================================");

    // Connect to MongoDB with a few retries. There is no in-memory fallback:
    // the score ledger must be durable, so an unreachable store is fatal.
    let mongo = connect_with_retries(&args).await?;

    let state = Arc::new(server::AppState::new(args, mongo).await?);

    server::run(state).await?;

    Ok(())
}

async fn connect_with_retries(args: &Args) -> anyhow::Result<MongoClient> {
    let mut attempt = 1;
    loop {
        match MongoClient::new(&args.mongo_uri, &args.mongo_db).await {
            Ok(client) => return Ok(client),
            Err(e) if attempt < args.mongo_connect_retries => {
                warn!(
                    "MongoDB connection failed (attempt {}/{}): {}",
                    attempt, args.mongo_connect_retries, e
                );
                tokio::time::sleep(Duration::from_secs(1)).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    "MongoDB connection failed after {} attempts: {}",
                    args.mongo_connect_retries, e
                );
                anyhow::bail!("could not connect to MongoDB: {}", e);
            }
        }
    }
}

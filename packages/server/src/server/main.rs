// Main entry point for server

use std::sync::Arc;

use anyhow::{Context, Result};
use ride_core::common::utils::ExpoClient;
use ride_core::domains::dispatch::sweeper;
use ride_core::kernel::Coordinator;
use ride_core::server::build_app;
use ride_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ride_core=debug,sqlx=warn,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Ride Dispatch Server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Connect to the Redis coordinator
    tracing::info!("Connecting to Redis...");
    let coordinator = Coordinator::connect(&config.redis_url)
        .await
        .context("Failed to connect to Redis")?;
    tracing::info!("Redis connected");

    // Build application
    let push = Arc::new(ExpoClient::new(config.expo_access_token.clone()));
    let (app, engine) = build_app(pool, coordinator, push, config.dispatch.clone());

    // Start the stranded-dispatch sweeper
    let mut scheduler = sweeper::start_sweeper(engine.clone())
        .await
        .context("Failed to start dispatch sweeper")?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop accepting new work, then flush timers and the sweeper
    tracing::info!("Shutting down");
    engine.shutdown();
    scheduler.shutdown().await.ok();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("Shutdown signal received");
}

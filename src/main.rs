// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use exam_portal::config::Config;
use exam_portal::routes;
use exam_portal::state::AppState;
use exam_portal::storage::{KeyValueStore, SqliteStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let file_appender = tracing_appender::rolling::daily("logs", "portal.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Err(e) = run(config).await {
        tracing::error!("Portal stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Open storage (connect retry and migrations live in the store)
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::connect(&config.database_url).await?);
    tracing::info!("Storage ready at {}", config.database_url);

    let state = AppState::new(config.clone(), store)?;

    // Pick up a session left over from the last run
    match state.sessions.restore().await {
        Some(session) => tracing::info!("Resumed session of user {}", session.user.id),
        None => tracing::info!("No stored session"),
    }

    // The portal still starts without a catalog; catalog routes answer 503
    // until a reload succeeds.
    if let Err(e) = state
        .catalog
        .load(config.catalog_source, &state.remote)
        .await
    {
        tracing::error!("Failed to load exam catalog: {}", e);
    }

    let _watcher = state
        .sessions
        .clone()
        .spawn_expiry_watcher(Duration::from_secs(config.session_check_interval_secs));

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);

    // Start the server
    axum::serve(listener, app).await?;
    Ok(())
}

//! Atrium Gate server.
//!
//! Entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use gate_core::config::AppConfig;
use gate_core::error::AppError;

#[tokio::main]
async fn main() {
    let env = std::env::var("ATRIUM_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Atrium Gate v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(config);

    // ── Session store ────────────────────────────────────────────
    let store: Arc<dyn gate_database::SessionStore> = match config.database.backend.as_str() {
        "memory" => {
            tracing::info!("Using in-memory session store");
            Arc::new(gate_database::MemorySessionStore::new())
        }
        _ => {
            let pool = gate_database::DatabasePool::connect(&config.database).await?;
            gate_database::run_migrations(pool.pool()).await?;
            Arc::new(gate_database::PostgresSessionStore::new(pool.pool().clone()))
        }
    };

    // ── Credential sealer ────────────────────────────────────────
    let sealer = Arc::new(gate_auth::TokenSealer::new(
        &config.gate.seal_secret,
        config.gate.token_ttl_ms as i64,
    )?);

    // ── Realtime hub ─────────────────────────────────────────────
    let hub = Arc::new(gate_realtime::GateHub::new(config.realtime.clone()));

    // ── Shutdown channel ─────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background tasks ─────────────────────────────────────────
    let ping_handle = tokio::spawn(gate_realtime::run_ping_loop(
        Arc::clone(&hub),
        shutdown_rx.clone(),
    ));

    let scheduler = gate_service::PromotionScheduler::new(
        gate_service::PromotionEngine::new(Arc::clone(&store), config.gate.clone()),
        gate_service::Occupancy::new(Arc::clone(&store), config.gate.clone()),
        Arc::clone(&store),
        Arc::clone(&hub),
        config.gate.clone(),
    );
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx.clone()));

    // ── HTTP server ──────────────────────────────────────────────
    let app_state = gate_api::AppState::new(
        Arc::clone(&config),
        Arc::clone(&store),
        sealer,
        Arc::clone(&hub),
    );
    let app = gate_api::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Atrium Gate listening on {addr}");

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Wait for background tasks ────────────────────────────────
    let _ = tokio::time::timeout(std::time::Duration::from_secs(10), ping_handle).await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(10), scheduler_handle).await;

    tracing::info!("Atrium Gate shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

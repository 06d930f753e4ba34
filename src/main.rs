//! PriceCall Backend Service
//!
//! Main entry point for the PriceCall prediction game backend.
//! This service runs:
//! - the guess lifecycle engine over a Postgres (or in-memory) store
//! - the price oracle with its cache and fallback generator
//! - the settlement worker that receives timer invocations and sweeps
//!   overdue guesses

use pricecall_backend::clock::{Clock, SystemClock};
use pricecall_backend::config::StoreBackend;
use pricecall_backend::database::{create_pool, run_migrations};
use pricecall_backend::oracle::PriceOracle;
use pricecall_backend::repositories::{GuessStore, InMemoryGuessStore, PgGuessStore};
use pricecall_backend::scheduler::TokioScheduler;
use pricecall_backend::settlement_worker::SettlementWorker;
use pricecall_backend::{AppConfig, AppError, AppResult, AppState};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const SETTLEMENT_CHANNEL_CAPACITY: usize = 1024;

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("pricecall_backend={},sqlx=warn", config.log_level).into()
    });

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn build_store(config: &AppConfig) -> AppResult<Arc<dyn GuessStore>> {
    match (config.store_backend, &config.database) {
        (StoreBackend::Postgres, Some(db_config)) => {
            info!("Connecting to database...");
            let pool = create_pool(db_config).await.map_err(|e| {
                error!("Failed to create database pool: {}", e);
                AppError::Database(e)
            })?;
            info!("Database pool ready (max connections: {})", db_config.max_connections);

            info!("Running database migrations...");
            run_migrations(&pool).await.map_err(|e| {
                error!("Database migration failed: {}", e);
                AppError::Database(e)
            })?;
            info!("Database migrations completed successfully");

            Ok(Arc::new(PgGuessStore::new(pool)))
        }
        (StoreBackend::Postgres, None) => Err(AppError::Config(
            "Postgres store selected without database configuration".to_string(),
        )),
        (StoreBackend::Memory, _) => {
            warn!("Using in-memory store: guesses and scores are lost on restart");
            Ok(Arc::new(InMemoryGuessStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    init_tracing(&config);

    info!("PriceCall backend starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Store backend: {:?}", config.store_backend);

    // =========================================================================
    // CORE SERVICES
    // =========================================================================
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store = build_store(&config).await?;

    let oracle = Arc::new(PriceOracle::from_config(&config.oracle, clock.clone())?);
    info!(
        "Price oracle: {} ({}/{}), cache TTL {}s, fallback {}",
        config.oracle.endpoint,
        config.oracle.asset,
        config.oracle.currency,
        config.oracle.cache_ttl_secs,
        if config.oracle.fallback_enabled { "enabled" } else { "disabled" }
    );

    let (sender, receiver) = mpsc::channel(SETTLEMENT_CHANNEL_CAPACITY);
    let scheduler = Arc::new(TokioScheduler::new(sender, clock.clone()));

    let app_state = AppState::new(&config, store, oracle, scheduler, clock);
    info!(
        "Guess service ready (resolution delay {}s, win {:+}, loss {:+})",
        config.game.resolution_delay_secs, config.game.win_delta, config.game.loss_delta
    );

    // =========================================================================
    // BACKGROUND TASKS
    // =========================================================================
    let worker = SettlementWorker::new(app_state.guess_service.clone(), receiver)
        .with_sweep_interval(config.game.sweep_interval())
        .with_sweep_batch_size(config.game.sweep_batch_size);

    let worker_handle = tokio::spawn(async move {
        worker.start().await;
    });
    info!("Settlement worker started");

    info!("PriceCall backend ready, press Ctrl+C to shut down");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = worker_handle => {
            error!("Settlement worker exited unexpectedly");
        }
    }

    info!("PriceCall backend shutdown complete");
    Ok(())
}

//! PriceCall Backend Library
//!
//! Guess lifecycle engine, price oracle and score arithmetic for the PriceCall
//! prediction game, exposed for the service binary and for tests.

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod oracle;
pub mod repositories;
pub mod scheduler;
pub mod scoring;
pub mod services;
pub mod settlement_worker;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorKind};

use clock::Clock;
use oracle::PriceOracle;
use repositories::GuessStore;
use scheduler::Scheduler;
use services::{GuessService, PlayerService};
use std::sync::Arc;

/// Services wired over the shared capabilities
pub struct AppState {
    pub player_service: Arc<PlayerService>,
    pub guess_service: Arc<GuessService>,
}

impl AppState {
    /// Wire services over the given capabilities
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn GuessStore>,
        oracle: Arc<PriceOracle>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let player_service = Arc::new(PlayerService::new(store.clone(), clock.clone()));
        let guess_service = Arc::new(GuessService::new(
            store,
            oracle,
            scheduler,
            clock,
            &config.game,
        ));

        Self {
            player_service,
            guess_service,
        }
    }
}

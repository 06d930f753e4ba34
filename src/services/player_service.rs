use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::Player;
use crate::repositories::GuessStore;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Player registration and lookup
pub struct PlayerService {
    store: Arc<dyn GuessStore>,
    clock: Arc<dyn Clock>,
}

impl PlayerService {
    pub fn new(store: Arc<dyn GuessStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Register a new player with a zero score
    pub async fn register_player(&self, name: &str) -> AppResult<Player> {
        let player = Player::new(name, self.clock.now()).map_err(AppError::Validation)?;

        self.store.put_player(&player).await?;

        info!("Registered player {} ({})", player.id, player.name);
        Ok(player)
    }

    pub async fn get_player(&self, player_id: Uuid) -> AppResult<Player> {
        self.store
            .get_player(player_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Player {} not found", player_id)))
    }
}

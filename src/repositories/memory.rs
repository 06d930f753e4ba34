use super::{GuessStore, SettlementWrite};
use crate::error::RepositoryError;
use crate::models::{Guess, GuessStatus, Player};
use crate::scoring::apply_delta;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    players: HashMap<Uuid, Player>,
    guesses: HashMap<Uuid, Guess>,
    /// player_id -> id of that player's ACTIVE guess
    active_by_player: HashMap<Uuid, Uuid>,
}

impl MemoryState {
    fn mark_terminal(
        &mut self,
        id: Uuid,
        status: GuessStatus,
        resolve_price: Decimal,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        if !status.is_terminal() {
            return Err(RepositoryError::InvalidInput(format!(
                "{} is not a terminal status",
                status.as_str()
            )));
        }

        let guess = self
            .guesses
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Guess {} not found", id)))?;

        if guess.status.is_terminal() {
            return Ok(false);
        }

        guess.status = status;
        guess.resolve_price = Some(resolve_price);
        guess.resolved_at = Some(resolved_at);
        let player_id = guess.player_id;

        if self.active_by_player.get(&player_id) == Some(&id) {
            self.active_by_player.remove(&player_id);
        }
        Ok(true)
    }

    fn adjust_score(
        &mut self,
        id: Uuid,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Player {} not found", id)))?;

        player.score = apply_delta(Some(player.score), delta);
        player.last_active_at = player.last_active_at.max(at);
        Ok(player.score)
    }
}

/// `GuessStore` held in process memory.
///
/// A single lock guards all maps, so every operation (including
/// `record_settlement`) is atomic with respect to the others.
#[derive(Default)]
pub struct InMemoryGuessStore {
    state: RwLock<MemoryState>,
}

impl InMemoryGuessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ACTIVE guesses held for a player
    pub async fn active_count(&self, player_id: Uuid) -> usize {
        let state = self.state.read().await;
        state
            .guesses
            .values()
            .filter(|g| g.player_id == player_id && g.is_active())
            .count()
    }
}

#[async_trait]
impl GuessStore for InMemoryGuessStore {
    async fn put_player(&self, player: &Player) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.players.contains_key(&player.id) {
            return Err(RepositoryError::Duplicate(format!(
                "Player {} already exists",
                player.id
            )));
        }
        state.players.insert(player.id, player.clone());
        Ok(())
    }

    async fn get_player(&self, id: Uuid) -> Result<Option<Player>, RepositoryError> {
        Ok(self.state.read().await.players.get(&id).cloned())
    }

    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let player = state
            .players
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Player {} not found", id)))?;
        player.last_active_at = player.last_active_at.max(at);
        Ok(())
    }

    async fn adjust_player_score(
        &self,
        id: Uuid,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        self.state.write().await.adjust_score(id, delta, at)
    }

    async fn put_guess(&self, guess: &Guess) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;

        if state.guesses.contains_key(&guess.id) {
            return Err(RepositoryError::Duplicate(format!(
                "Guess {} already exists",
                guess.id
            )));
        }
        if !state.players.contains_key(&guess.player_id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "Player {} does not exist",
                guess.player_id
            )));
        }
        if guess.is_active() {
            if state.active_by_player.contains_key(&guess.player_id) {
                return Err(RepositoryError::Duplicate(format!(
                    "Player {} already has an active guess",
                    guess.player_id
                )));
            }
            state.active_by_player.insert(guess.player_id, guess.id);
        }

        state.guesses.insert(guess.id, guess.clone());
        Ok(())
    }

    async fn get_guess(&self, id: Uuid) -> Result<Option<Guess>, RepositoryError> {
        Ok(self.state.read().await.guesses.get(&id).cloned())
    }

    async fn find_active_guess(&self, player_id: Uuid) -> Result<Option<Guess>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .active_by_player
            .get(&player_id)
            .and_then(|id| state.guesses.get(id))
            .cloned())
    }

    async fn find_recent_guesses(
        &self,
        player_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Guess>, RepositoryError> {
        let state = self.state.read().await;
        let mut guesses: Vec<Guess> = state
            .guesses
            .values()
            .filter(|g| g.player_id == player_id)
            .cloned()
            .collect();
        guesses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        guesses.truncate(limit.max(0) as usize);
        Ok(guesses)
    }

    async fn find_overdue_guesses(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Guess>, RepositoryError> {
        let state = self.state.read().await;
        let mut guesses: Vec<Guess> = state
            .active_by_player
            .values()
            .filter_map(|id| state.guesses.get(id))
            .filter(|g| g.is_due(now))
            .cloned()
            .collect();
        guesses.sort_by(|a, b| a.resolve_at.cmp(&b.resolve_at));
        guesses.truncate(limit.max(0) as usize);
        Ok(guesses)
    }

    async fn update_guess_terminal(
        &self,
        id: Uuid,
        status: GuessStatus,
        resolve_price: Decimal,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        self.state
            .write()
            .await
            .mark_terminal(id, status, resolve_price, resolved_at)
    }

    async fn record_settlement(
        &self,
        write: &SettlementWrite,
    ) -> Result<Option<i64>, RepositoryError> {
        let mut state = self.state.write().await;

        // Fail before touching the guess so the pair stays all-or-nothing
        if !state.players.contains_key(&write.player_id) {
            return Err(RepositoryError::NotFound(format!(
                "Player {} not found",
                write.player_id
            )));
        }

        let transitioned = state.mark_terminal(
            write.guess_id,
            write.status,
            write.resolve_price,
            write.resolved_at,
        )?;
        if !transitioned {
            return Ok(None);
        }

        let score = state.adjust_score(write.player_id, write.score_delta, write.resolved_at)?;
        Ok(Some(score))
    }
}

//! Durable storage for players and guesses.
//!
//! `GuessStore` is the capability the lifecycle engine depends on. It is
//! implemented over Postgres (`PgGuessStore`, composing one repository per
//! table) and in process memory (`InMemoryGuessStore`).

pub mod guess_repository;
pub mod memory;
pub mod player_repository;
pub mod postgres;

pub use guess_repository::GuessRepository;
pub use memory::InMemoryGuessStore;
pub use player_repository::PlayerRepository;
pub use postgres::PgGuessStore;

use crate::error::RepositoryError;
use crate::models::{Guess, GuessStatus, Player};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Terminal transition of a guess together with the matching score change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementWrite {
    pub guess_id: Uuid,
    pub player_id: Uuid,
    pub status: GuessStatus,
    pub resolve_price: Decimal,
    pub resolved_at: DateTime<Utc>,
    pub score_delta: i64,
}

#[async_trait]
pub trait GuessStore: Send + Sync {
    /// Insert a player. Fails with `Duplicate` if the id exists.
    async fn put_player(&self, player: &Player) -> Result<(), RepositoryError>;

    async fn get_player(&self, id: Uuid) -> Result<Option<Player>, RepositoryError>;

    /// Advance a player's last-active timestamp
    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Atomically apply `delta` to the player's score with the floor-at-zero
    /// rule and advance last-active. Returns the resulting score.
    async fn adjust_player_score(
        &self,
        id: Uuid,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<i64, RepositoryError>;

    /// Insert a guess. Fails with `Duplicate` if the id exists or the player
    /// already has an ACTIVE guess.
    async fn put_guess(&self, guess: &Guess) -> Result<(), RepositoryError>;

    async fn get_guess(&self, id: Uuid) -> Result<Option<Guess>, RepositoryError>;

    /// The player's ACTIVE guess, if any
    async fn find_active_guess(&self, player_id: Uuid) -> Result<Option<Guess>, RepositoryError>;

    /// The player's most recent guesses, newest first
    async fn find_recent_guesses(
        &self,
        player_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Guess>, RepositoryError>;

    /// ACTIVE guesses whose resolve time is at or before `now`, oldest first
    async fn find_overdue_guesses(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Guess>, RepositoryError>;

    /// Move an ACTIVE guess to a terminal status. Returns false if the guess
    /// was not ACTIVE (nothing written).
    async fn update_guess_terminal(
        &self,
        id: Uuid,
        status: GuessStatus,
        resolve_price: Decimal,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Terminal guess update and score adjustment as one atomic unit.
    ///
    /// Returns `Some(new_score)` when this call settled the guess and `None`
    /// when the guess was already terminal, in which case nothing is written.
    async fn record_settlement(
        &self,
        write: &SettlementWrite,
    ) -> Result<Option<i64>, RepositoryError>;
}

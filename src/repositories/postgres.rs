use super::{GuessRepository, GuessStore, PlayerRepository, SettlementWrite};
use crate::error::RepositoryError;
use crate::models::{Guess, GuessStatus, Player};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres-backed `GuessStore`
pub struct PgGuessStore {
    pool: PgPool,
    player_repo: PlayerRepository,
    guess_repo: GuessRepository,
}

impl PgGuessStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            player_repo: PlayerRepository::new(pool.clone()),
            guess_repo: GuessRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl GuessStore for PgGuessStore {
    async fn put_player(&self, player: &Player) -> Result<(), RepositoryError> {
        self.player_repo.create(player).await
    }

    async fn get_player(&self, id: Uuid) -> Result<Option<Player>, RepositoryError> {
        self.player_repo.find_by_id(id).await
    }

    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.player_repo.touch_last_active(id, at).await
    }

    async fn adjust_player_score(
        &self,
        id: Uuid,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        self.player_repo.adjust_score(id, delta, at).await
    }

    async fn put_guess(&self, guess: &Guess) -> Result<(), RepositoryError> {
        self.guess_repo.create(guess).await
    }

    async fn get_guess(&self, id: Uuid) -> Result<Option<Guess>, RepositoryError> {
        self.guess_repo.find_by_id(id).await
    }

    async fn find_active_guess(&self, player_id: Uuid) -> Result<Option<Guess>, RepositoryError> {
        self.guess_repo.find_active_by_player(player_id).await
    }

    async fn find_recent_guesses(
        &self,
        player_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Guess>, RepositoryError> {
        self.guess_repo.find_recent_by_player(player_id, limit).await
    }

    async fn find_overdue_guesses(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Guess>, RepositoryError> {
        self.guess_repo.find_overdue(now, limit).await
    }

    async fn update_guess_terminal(
        &self,
        id: Uuid,
        status: GuessStatus,
        resolve_price: Decimal,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        self.guess_repo
            .mark_terminal(id, status, resolve_price, resolved_at)
            .await
    }

    async fn record_settlement(
        &self,
        write: &SettlementWrite,
    ) -> Result<Option<i64>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let transitioned = GuessRepository::mark_terminal_with(
            &mut *tx,
            write.guess_id,
            write.status,
            write.resolve_price,
            write.resolved_at,
        )
        .await?;

        if !transitioned {
            tx.rollback().await?;
            return Ok(None);
        }

        let score = PlayerRepository::adjust_score_with(
            &mut *tx,
            write.player_id,
            write.score_delta,
            write.resolved_at,
        )
        .await?;

        tx.commit().await?;

        Ok(Some(score))
    }
}

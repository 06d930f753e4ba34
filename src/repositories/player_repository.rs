use crate::error::RepositoryError;
use crate::models::Player;
use crate::scoring::SCORE_UPDATE_SQL;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct PlayerRow {
    id: Uuid,
    name: String,
    score: Option<i64>,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
}

impl From<PlayerRow> for Player {
    fn from(row: PlayerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            score: row.score.unwrap_or(0),
            created_at: row.created_at,
            last_active_at: row.last_active_at,
        }
    }
}

/// Repository for player data access
pub struct PlayerRepository {
    pool: PgPool,
}

impl PlayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new player
    pub async fn create(&self, player: &Player) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO players (id, name, score, created_at, last_active_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(player.id)
        .bind(&player.name)
        .bind(player.score)
        .bind(player.created_at)
        .bind(player.last_active_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find a player by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Player>, RepositoryError> {
        let row = sqlx::query_as::<_, PlayerRow>(
            r#"
            SELECT id, name, score, created_at, last_active_at
            FROM players
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Player::from))
    }

    /// Advance last-active. Errors with `NotFound` if the player is missing.
    pub async fn touch_last_active(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE players
            SET last_active_at = GREATEST(last_active_at, $2)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Player {} not found", id)));
        }
        Ok(())
    }

    /// Floor-at-zero score adjustment as a single conditional UPDATE
    pub async fn adjust_score(
        &self,
        id: Uuid,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        Self::adjust_score_with(&self.pool, id, delta, at).await
    }

    /// Same as [`adjust_score`](Self::adjust_score) on any executor, so it
    /// can join a transaction
    pub async fn adjust_score_with<'e, E>(
        executor: E,
        id: Uuid,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<i64, RepositoryError>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            UPDATE players
            SET score = {},
                last_active_at = GREATEST(last_active_at, $3)
            WHERE id = $1
            RETURNING COALESCE(score, 0)
            "#,
            SCORE_UPDATE_SQL
        );

        let score: Option<i64> = sqlx::query_scalar(&sql)
            .bind(id)
            .bind(delta)
            .bind(at)
            .fetch_optional(executor)
            .await?;

        score.ok_or_else(|| RepositoryError::NotFound(format!("Player {} not found", id)))
    }
}

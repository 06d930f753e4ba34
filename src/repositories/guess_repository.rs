use crate::error::RepositoryError;
use crate::models::{Direction, Guess, GuessStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgPool};
use std::convert::TryFrom;
use uuid::Uuid;

const GUESS_COLUMNS: &str = "id, player_id, direction, snapshot_price, status, created_at, resolve_at, resolve_price, resolved_at";

#[derive(Debug, FromRow)]
struct GuessRow {
    id: Uuid,
    player_id: Uuid,
    direction: String,
    snapshot_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    resolve_at: DateTime<Utc>,
    resolve_price: Option<Decimal>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<GuessRow> for Guess {
    type Error = RepositoryError;

    fn try_from(row: GuessRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            player_id: row.player_id,
            direction: Direction::from_str(&row.direction).map_err(RepositoryError::InvalidInput)?,
            snapshot_price: row.snapshot_price,
            status: GuessStatus::from_str(&row.status).map_err(RepositoryError::InvalidInput)?,
            created_at: row.created_at,
            resolve_at: row.resolve_at,
            resolve_price: row.resolve_price,
            resolved_at: row.resolved_at,
        })
    }
}

fn into_guesses(rows: Vec<GuessRow>) -> Result<Vec<Guess>, RepositoryError> {
    rows.into_iter().map(Guess::try_from).collect()
}

/// Repository for guess data access
pub struct GuessRepository {
    pool: PgPool,
}

impl GuessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new guess.
    ///
    /// The primary key and the partial unique index on ACTIVE guesses both
    /// surface as `RepositoryError::Duplicate`.
    pub async fn create(&self, guess: &Guess) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO guesses
                (id, player_id, direction, snapshot_price, status, created_at, resolve_at, resolve_price, resolved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(guess.id)
        .bind(guess.player_id)
        .bind(guess.direction.as_str())
        .bind(guess.snapshot_price)
        .bind(guess.status.as_str())
        .bind(guess.created_at)
        .bind(guess.resolve_at)
        .bind(guess.resolve_price)
        .bind(guess.resolved_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find a guess by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Guess>, RepositoryError> {
        let sql = format!("SELECT {} FROM guesses WHERE id = $1", GUESS_COLUMNS);
        let row = sqlx::query_as::<_, GuessRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Guess::try_from).transpose()
    }

    /// Find the player's ACTIVE guess (served by the partial unique index)
    pub async fn find_active_by_player(
        &self,
        player_id: Uuid,
    ) -> Result<Option<Guess>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM guesses WHERE player_id = $1 AND status = 'ACTIVE'",
            GUESS_COLUMNS
        );
        let row = sqlx::query_as::<_, GuessRow>(&sql)
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Guess::try_from).transpose()
    }

    /// Find the player's most recent guesses
    pub async fn find_recent_by_player(
        &self,
        player_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Guess>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {} FROM guesses
            WHERE player_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            GUESS_COLUMNS
        );
        let rows = sqlx::query_as::<_, GuessRow>(&sql)
            .bind(player_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        into_guesses(rows)
    }

    /// Find ACTIVE guesses past their resolve time
    pub async fn find_overdue(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Guess>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {} FROM guesses
            WHERE status = 'ACTIVE' AND resolve_at <= $1
            ORDER BY resolve_at ASC
            LIMIT $2
            "#,
            GUESS_COLUMNS
        );
        let rows = sqlx::query_as::<_, GuessRow>(&sql)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        into_guesses(rows)
    }

    /// Conditional ACTIVE -> terminal transition
    pub async fn mark_terminal(
        &self,
        id: Uuid,
        status: GuessStatus,
        resolve_price: Decimal,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        Self::mark_terminal_with(&self.pool, id, status, resolve_price, resolved_at).await
    }

    /// Same as [`mark_terminal`](Self::mark_terminal) on any executor
    pub async fn mark_terminal_with<'e, E>(
        executor: E,
        id: Uuid,
        status: GuessStatus,
        resolve_price: Decimal,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>
    where
        E: PgExecutor<'e>,
    {
        if !status.is_terminal() {
            return Err(RepositoryError::InvalidInput(format!(
                "{} is not a terminal status",
                status.as_str()
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE guesses
            SET status = $2, resolve_price = $3, resolved_at = $4
            WHERE id = $1 AND status = 'ACTIVE'
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(resolve_price)
        .bind(resolved_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

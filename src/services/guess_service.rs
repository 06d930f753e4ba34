use crate::clock::Clock;
use crate::config::GameConfig;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::models::{Direction, Guess, GuessStatus, Player};
use crate::oracle::{PriceOracle, PriceQuote};
use crate::repositories::{GuessStore, SettlementWrite};
use crate::scheduler::{Scheduler, SettlementPayload};
use crate::scoring::ScoreRules;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How a settlement request reached the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SettlementInvocation {
    /// Fired by the scheduler at or after the resolve time
    Timer { guess_id: Uuid, player_id: Uuid },
    /// Manual or administrative trigger
    Direct { guess_id: Uuid, player_id: Uuid },
}

impl SettlementInvocation {
    pub fn guess_id(&self) -> Uuid {
        match self {
            SettlementInvocation::Timer { guess_id, .. }
            | SettlementInvocation::Direct { guess_id, .. } => *guess_id,
        }
    }

    pub fn player_id(&self) -> Uuid {
        match self {
            SettlementInvocation::Timer { player_id, .. }
            | SettlementInvocation::Direct { player_id, .. } => *player_id,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            SettlementInvocation::Timer { .. } => "timer",
            SettlementInvocation::Direct { .. } => "direct",
        }
    }
}

/// Result of a successful create
#[derive(Debug, Clone, Serialize)]
pub struct CreatedGuess {
    pub guess_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub resolve_at: DateTime<Utc>,
    pub snapshot_price: Decimal,
    /// False when the automatic settlement trigger could not be armed
    pub scheduled: bool,
    /// Set alongside `scheduled = false`
    pub schedule_error: Option<ErrorKind>,
}

/// Result of a settle call, fresh or idempotent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementOutcome {
    pub guess_id: Uuid,
    pub player_id: Uuid,
    pub status: GuessStatus,
    pub won: bool,
    pub snapshot_price: Decimal,
    pub resolve_price: Decimal,
    pub resolved_at: DateTime<Utc>,
    pub score: i64,
    /// True when the guess had already been settled before this call
    pub already_settled: bool,
}

/// Read model for a player's view of the game
#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    pub player: Player,
    pub active_guess: Option<Guess>,
    pub recent_guesses: Vec<Guess>,
    pub price: PriceQuote,
}

/// Guess lifecycle engine: create, settle and player-state reads
pub struct GuessService {
    store: Arc<dyn GuessStore>,
    oracle: Arc<PriceOracle>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    rules: ScoreRules,
    resolution_delay: Duration,
    recent_limit: i64,
}

impl GuessService {
    pub fn new(
        store: Arc<dyn GuessStore>,
        oracle: Arc<PriceOracle>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        game: &GameConfig,
    ) -> Self {
        Self {
            store,
            oracle,
            scheduler,
            clock,
            rules: ScoreRules::from(game),
            resolution_delay: game.resolution_delay(),
            recent_limit: game.recent_guesses_limit,
        }
    }

    /// Create a new ACTIVE guess for a player and arm its settlement timer.
    ///
    /// A scheduling failure is logged and reported through
    /// `CreatedGuess::scheduled`; the guess stays ACTIVE and can still be
    /// settled by a direct invocation.
    pub async fn create_guess(&self, player_id: Uuid, direction: Direction) -> AppResult<CreatedGuess> {
        info!("Creating guess: player={}, direction={}", player_id, direction.as_str());

        self.require_player(player_id).await?;

        if let Some(active) = self.store.find_active_guess(player_id).await? {
            return Err(AppError::Conflict(format!(
                "Player {} already has active guess {}",
                player_id, active.id
            )));
        }

        let snapshot_price = self.oracle.current_price().await?;
        let now = self.clock.now();
        let guess = Guess::new(player_id, direction, snapshot_price, now, self.resolution_delay);

        // A concurrent create that slipped past the check above lands here
        self.store.put_guess(&guess).await?;

        let payload = SettlementPayload {
            guess_id: guess.id,
            player_id,
        };
        let schedule_error = match self.scheduler.schedule_once(guess.resolve_at, payload).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Guess {} created without automatic settlement: {}", guess.id, e);
                Some(AppError::from(e).kind())
            }
        };

        // Best effort once the guess is stored
        if let Err(e) = self.store.touch_last_active(player_id, now).await {
            warn!("Failed to update last activity for player {}: {}", player_id, e);
        }

        info!(
            "Guess {} created at snapshot {} (resolves at {})",
            guess.id, snapshot_price, guess.resolve_at
        );

        Ok(CreatedGuess {
            guess_id: guess.id,
            created_at: guess.created_at,
            resolve_at: guess.resolve_at,
            snapshot_price,
            scheduled: schedule_error.is_none(),
            schedule_error,
        })
    }

    /// Settlement entry point for both timer and direct invocations
    pub async fn handle_invocation(
        &self,
        invocation: SettlementInvocation,
    ) -> AppResult<SettlementOutcome> {
        debug!(
            "Settlement invocation ({}) for guess {}",
            invocation.source(),
            invocation.guess_id()
        );
        self.settle(invocation.guess_id(), invocation.player_id()).await
    }

    /// Settle a guess exactly once.
    ///
    /// Repeated calls for a settled guess return the stored outcome with
    /// `already_settled = true` and touch neither price nor score.
    pub async fn settle(&self, guess_id: Uuid, player_id: Uuid) -> AppResult<SettlementOutcome> {
        let guess = self.require_guess(guess_id).await?;

        if guess.player_id != player_id {
            return Err(AppError::Unauthorized(format!(
                "Guess {} does not belong to player {}",
                guess_id, player_id
            )));
        }

        if guess.status.is_terminal() {
            debug!("Guess {} already settled as {}", guess_id, guess.status.as_str());
            return self.settled_outcome(&guess).await;
        }

        let resolve_price = self.oracle.current_price().await?;
        let won = guess.direction.wins(guess.snapshot_price, resolve_price);
        let status = GuessStatus::from_outcome(won);
        let resolved_at = self.clock.now();

        let write = SettlementWrite {
            guess_id,
            player_id,
            status,
            resolve_price,
            resolved_at,
            score_delta: self.rules.delta_for(won),
        };

        match self.store.record_settlement(&write).await? {
            Some(score) => {
                info!(
                    "Guess {} settled {}: snapshot {} -> {} (score {})",
                    guess_id,
                    status.as_str(),
                    guess.snapshot_price,
                    resolve_price,
                    score
                );

                Ok(SettlementOutcome {
                    guess_id,
                    player_id,
                    status,
                    won,
                    snapshot_price: guess.snapshot_price,
                    resolve_price,
                    resolved_at,
                    score,
                    already_settled: false,
                })
            }
            None => {
                // Lost a race with another settlement of the same guess
                debug!("Guess {} was settled concurrently", guess_id);
                let settled = self.require_guess(guess_id).await?;
                self.settled_outcome(&settled).await
            }
        }
    }

    /// Player view for read paths; uses the cached price
    pub async fn player_state(&self, player_id: Uuid) -> AppResult<PlayerState> {
        let player = self.require_player(player_id).await?;

        let active_guess = self.store.find_active_guess(player_id).await?;
        let recent_guesses = self
            .store
            .find_recent_guesses(player_id, self.recent_limit)
            .await?;
        let price = self.oracle.cached_price().await?;

        self.store.touch_last_active(player_id, self.clock.now()).await?;

        Ok(PlayerState {
            player,
            active_guess,
            recent_guesses,
            price,
        })
    }

    /// Settle every ACTIVE guess already past its resolve time.
    ///
    /// Returns the number of guesses this call settled. Individual failures
    /// are logged and skipped.
    pub async fn settle_overdue(&self, limit: i64) -> AppResult<usize> {
        let overdue = self.store.find_overdue_guesses(self.clock.now(), limit).await?;
        let mut settled = 0;

        for guess in overdue {
            match self.settle(guess.id, guess.player_id).await {
                Ok(outcome) if !outcome.already_settled => settled += 1,
                Ok(_) => {}
                Err(e) => warn!("Failed to settle overdue guess {}: {}", guess.id, e),
            }
        }

        Ok(settled)
    }

    async fn require_player(&self, player_id: Uuid) -> AppResult<Player> {
        self.store
            .get_player(player_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Player {} not found", player_id)))
    }

    async fn require_guess(&self, guess_id: Uuid) -> AppResult<Guess> {
        self.store
            .get_guess(guess_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Guess {} not found", guess_id)))
    }

    async fn settled_outcome(&self, guess: &Guess) -> AppResult<SettlementOutcome> {
        let (resolve_price, resolved_at) = match (guess.resolve_price, guess.resolved_at) {
            (Some(price), Some(at)) => (price, at),
            _ => {
                return Err(AppError::Store(format!(
                    "Guess {} is {} without resolution data",
                    guess.id,
                    guess.status.as_str()
                )))
            }
        };

        let score = self.require_player(guess.player_id).await?.score;

        Ok(SettlementOutcome {
            guess_id: guess.id,
            player_id: guess.player_id,
            status: guess.status,
            won: guess.status == GuessStatus::Won,
            snapshot_price: guess.snapshot_price,
            resolve_price,
            resolved_at,
            score,
            already_settled: true,
        })
    }
}

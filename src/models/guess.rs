use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction the player expects the price to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(format!("Invalid direction: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Whether a guess in this direction wins.
    ///
    /// An unchanged price counts as "did not rise": it loses for `Up` and
    /// wins for `Down`.
    pub fn wins(&self, snapshot_price: Decimal, resolve_price: Decimal) -> bool {
        let price_rose = resolve_price > snapshot_price;
        match self {
            Direction::Up => price_rose,
            Direction::Down => !price_rose,
        }
    }
}

/// Guess lifecycle status. `Won` and `Lost` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GuessStatus {
    Active,
    Won,
    Lost,
}

impl GuessStatus {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(GuessStatus::Active),
            "WON" => Ok(GuessStatus::Won),
            "LOST" => Ok(GuessStatus::Lost),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            GuessStatus::Active => "ACTIVE",
            GuessStatus::Won => "WON",
            GuessStatus::Lost => "LOST",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, GuessStatus::Active)
    }

    pub fn from_outcome(won: bool) -> Self {
        if won {
            GuessStatus::Won
        } else {
            GuessStatus::Lost
        }
    }
}

/// A single directional bet tied to a snapshot price and a settlement deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guess {
    pub id: Uuid,
    pub player_id: Uuid,
    pub direction: Direction,
    pub snapshot_price: Decimal,
    pub status: GuessStatus,
    pub created_at: DateTime<Utc>,
    pub resolve_at: DateTime<Utc>,
    pub resolve_price: Option<Decimal>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Guess {
    /// Create a new ACTIVE guess that resolves `delay` after `now`
    pub fn new(
        player_id: Uuid,
        direction: Direction,
        snapshot_price: Decimal,
        now: DateTime<Utc>,
        delay: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            direction,
            snapshot_price,
            status: GuessStatus::Active,
            created_at: now,
            resolve_at: now + delay,
            resolve_price: None,
            resolved_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == GuessStatus::Active
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.resolve_at <= now
    }
}

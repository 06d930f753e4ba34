use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 50;

/// Player taking part in the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Player {
    /// Create a new player with a validated display name and a zero score
    pub fn new(name: &str, now: DateTime<Utc>) -> Result<Self, String> {
        let name = Self::normalize_name(name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            score: 0,
            created_at: now,
            last_active_at: now,
        })
    }

    /// Trim and length-check a display name
    pub fn normalize_name(name: &str) -> Result<String, String> {
        let trimmed = name.trim();
        let len = trimmed.chars().count();
        if len < MIN_NAME_LEN || len > MAX_NAME_LEN {
            return Err(format!(
                "Name must be between {} and {} characters",
                MIN_NAME_LEN, MAX_NAME_LEN
            ));
        }
        Ok(trimmed.to_string())
    }
}

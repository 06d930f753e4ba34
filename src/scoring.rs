//! Score arithmetic with the floor-at-zero rule.

use crate::config::GameConfig;

/// Score deltas applied on settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreRules {
    pub win_delta: i64,
    pub loss_delta: i64,
}

impl ScoreRules {
    pub fn new(win_delta: i64, loss_delta: i64) -> Self {
        Self {
            win_delta,
            loss_delta,
        }
    }

    pub fn delta_for(&self, won: bool) -> i64 {
        if won {
            self.win_delta
        } else {
            self.loss_delta
        }
    }
}

impl Default for ScoreRules {
    fn default() -> Self {
        Self::new(1, -1)
    }
}

impl From<&GameConfig> for ScoreRules {
    fn from(config: &GameConfig) -> Self {
        Self::new(config.win_delta, config.loss_delta)
    }
}

/// Apply `delta` to a possibly-absent score.
///
/// Absent counts as 0. A negative delta only applies when the score covers
/// its full magnitude; otherwise the score is left unchanged.
pub fn apply_delta(current: Option<i64>, delta: i64) -> i64 {
    let current = current.unwrap_or(0);
    if delta >= 0 {
        return current.saturating_add(delta);
    }
    match current.checked_add(delta) {
        Some(next) if next >= 0 => next,
        _ => current,
    }
}

/// Same rule as [`apply_delta`] as a single Postgres expression over the
/// `score` column, with the delta bound to `$2`.
pub const SCORE_UPDATE_SQL: &str = r#"
    CASE
        WHEN $2 >= 0 THEN COALESCE(score, 0) + $2
        WHEN COALESCE(score, 0) + $2 >= 0 THEN COALESCE(score, 0) + $2
        ELSE COALESCE(score, 0)
    END
"#;

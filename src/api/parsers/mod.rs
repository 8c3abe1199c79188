mod leaderboard;
mod pagination;
mod player;
mod score;

pub use leaderboard::parse_leaderboard;
pub use pagination::has_more_pages;
pub use player::{parse_leaderboard_player, parse_player};
pub use score::parse_score;

use chrono::{DateTime, Utc};

use crate::errors::{StatsError, StatsResult};

fn parse_timestamp(raw: &str, field: &str) -> StatsResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StatsError::InvalidToken(format!("{} '{}' is not RFC 3339: {}", field, raw, e)))
}

fn require(condition: bool, message: impl FnOnce() -> String) -> StatsResult<()> {
    if condition {
        Ok(())
    } else {
        Err(StatsError::InvalidToken(message()))
    }
}

use chrono::{DateTime, Utc};

use super::{parse_timestamp, require};
use crate::api::tokens::{LeaderboardPlayerToken, PlayerToken};
use crate::domain::Player;
use crate::errors::StatsResult;

pub fn parse_player(token: &PlayerToken, fetched_at: DateTime<Utc>) -> StatsResult<Player> {
    require(!token.id.trim().is_empty(), || "player id is empty".to_string())?;
    require(token.pp.is_finite() && token.pp >= 0.0, || {
        format!("player {} has invalid pp {}", token.id, token.pp)
    })?;

    let first_seen = token
        .first_seen
        .as_deref()
        .map(|raw| parse_timestamp(raw, "firstSeen"))
        .transpose()?;

    let mut player = Player::stub(&token.id, &token.name, token.country.clone());
    player.pp = token.pp;
    // upstream reports 0 for players without a position
    player.rank = positive(token.rank);
    player.country_rank = positive(token.country_rank);
    player.inactive = token.inactive;
    player.banned = token.banned;
    player.first_seen = first_seen;
    player.updated_at = Some(fetched_at);

    if let Some(stats) = &token.score_stats {
        player.total_score = stats.total_score;
        player.total_ranked_score = stats.total_ranked_score;
        player.total_play_count = stats.total_play_count;
        player.ranked_play_count = stats.ranked_play_count;
        player.average_ranked_accuracy = (stats.ranked_play_count > 0)
            .then_some(stats.average_ranked_accuracy);
    }

    Ok(player)
}

/// Minimal player record from a leaderboard page
pub fn parse_leaderboard_player(token: &LeaderboardPlayerToken) -> StatsResult<Player> {
    require(!token.id.trim().is_empty(), || "player id is empty".to_string())?;
    Ok(Player::stub(&token.id, &token.name, token.country.clone()))
}

fn positive(value: i64) -> Option<i64> {
    (value > 0).then_some(value)
}

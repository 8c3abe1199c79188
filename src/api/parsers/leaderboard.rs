use super::{parse_timestamp, require};
use crate::api::tokens::LeaderboardToken;
use crate::domain::Leaderboard;
use crate::errors::StatsResult;

/// Validates a leaderboard token. Negative stars are clamped to 0; the local
/// `seeded_scores` flag always starts unset.
pub fn parse_leaderboard(token: &LeaderboardToken) -> StatsResult<Leaderboard> {
    require(token.id > 0, || format!("leaderboard id {} is not positive", token.id))?;
    require(!token.song_hash.trim().is_empty(), || {
        format!("leaderboard {} has no song hash", token.id)
    })?;
    require(token.stars.is_finite(), || {
        format!("leaderboard {} has non-finite stars", token.id)
    })?;
    require(token.max_score >= 0, || {
        format!("leaderboard {} has negative max score", token.id)
    })?;

    let ranked_date = token
        .ranked_date
        .as_deref()
        .map(|raw| parse_timestamp(raw, "rankedDate"))
        .transpose()?;

    Ok(Leaderboard {
        id: token.id,
        song_hash: token.song_hash.to_uppercase(),
        song_name: token.song_name.clone(),
        difficulty: token.difficulty.difficulty,
        stars: token.stars.max(0.0),
        max_score: token.max_score,
        ranked: token.ranked,
        qualified: token.qualified,
        seeded_scores: false,
        ranked_date,
    })
}

use super::{parse_timestamp, require};
use crate::api::tokens::ScoreToken;
use crate::domain::{Leaderboard, NewScore};
use crate::errors::StatsResult;

/// Validates a score token and derives accuracy and pp from its leaderboard.
pub fn parse_score(
    token: &ScoreToken,
    player_id: &str,
    leaderboard: &Leaderboard,
) -> StatsResult<NewScore> {
    require(token.id > 0, || format!("score id {} is not positive", token.id))?;
    require(!player_id.trim().is_empty(), || {
        format!("score {} has no player", token.id)
    })?;
    require(token.base_score >= 0 && token.modified_score >= 0, || {
        format!("score {} has a negative value", token.id)
    })?;

    let timestamp = parse_timestamp(&token.time_set, "timeSet")?;
    let accuracy = leaderboard.accuracy_of(token.modified_score);

    Ok(NewScore {
        score_id: token.id,
        player_id: player_id.to_string(),
        leaderboard_id: leaderboard.id,
        base_score: token.base_score,
        modified_score: token.modified_score,
        accuracy,
        pp: leaderboard.pp_for(accuracy),
        modifiers: token.modifiers.clone(),
        misses: token.missed_notes,
        bad_cuts: token.bad_cuts,
        max_combo: token.max_combo,
        full_combo: token.full_combo,
        timestamp,
    })
}

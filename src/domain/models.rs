use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::rating::curve;

pub type PlayerId = String;
pub type LeaderboardId = i64;

/// Ranked map difficulty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub id: LeaderboardId,
    pub song_hash: String,
    pub song_name: String,
    pub difficulty: i32,
    pub stars: f64,
    pub max_score: i64,
    pub ranked: bool,
    pub qualified: bool,
    pub seeded_scores: bool,
    pub ranked_date: Option<DateTime<Utc>>,
}

impl Leaderboard {
    /// PP only exists on ranked maps with a star rating.
    pub fn awards_pp(&self) -> bool {
        self.ranked && self.stars > 0.0
    }

    /// Accuracy in percent, `None` while the max score is unknown.
    pub fn accuracy_of(&self, modified_score: i64) -> Option<f64> {
        if self.max_score <= 0 {
            return None;
        }
        Some(modified_score as f64 / self.max_score as f64 * 100.0)
    }

    pub fn pp_for(&self, accuracy: Option<f64>) -> f64 {
        match accuracy {
            Some(acc) if self.awards_pp() => curve::get_pp(self.stars, acc),
            _ => 0.0,
        }
    }
}

/// Player profile as last reported by the upstream ranking system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub country: Option<String>,
    pub pp: f64,
    pub rank: Option<i64>,
    pub country_rank: Option<i64>,
    pub average_ranked_accuracy: Option<f64>,
    pub total_score: i64,
    pub total_ranked_score: i64,
    pub total_play_count: i64,
    pub ranked_play_count: i64,
    pub inactive: bool,
    pub banned: bool,
    pub first_seen: Option<DateTime<Utc>>,
    pub joined_date: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Player {
    /// Minimal profile for players only known from a leaderboard page.
    pub fn stub(id: &str, name: &str, country: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            country,
            pp: 0.0,
            rank: None,
            country_rank: None,
            average_ranked_accuracy: None,
            total_score: 0,
            total_ranked_score: 0,
            total_play_count: 0,
            ranked_play_count: 0,
            inactive: false,
            banned: false,
            first_seen: None,
            joined_date: None,
            updated_at: None,
        }
    }
}

/// Validated score ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewScore {
    pub score_id: i64,
    pub player_id: PlayerId,
    pub leaderboard_id: LeaderboardId,
    pub base_score: i64,
    pub modified_score: i64,
    pub accuracy: Option<f64>,
    pub pp: f64,
    pub modifiers: String,
    pub misses: i32,
    pub bad_cuts: i32,
    pub max_combo: i32,
    pub full_combo: bool,
    pub timestamp: DateTime<Utc>,
}

/// Stored score. `id` is the local row id and follows insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub id: i64,
    pub score_id: i64,
    pub player_id: PlayerId,
    pub leaderboard_id: LeaderboardId,
    pub base_score: i64,
    pub modified_score: i64,
    pub accuracy: Option<f64>,
    pub pp: f64,
    pub weight: Option<f64>,
    pub rank: Option<i64>,
    pub modifiers: String,
    pub misses: i32,
    pub bad_cuts: i32,
    pub max_combo: i32,
    pub full_combo: bool,
    pub timestamp: DateTime<Utc>,
}

impl Score {
    /// True when this play beats `previous` on the same leaderboard.
    /// Plays that award pp compare pp, the rest compare accuracy.
    pub fn improves_on(&self, previous: &Score, awards_pp: bool) -> bool {
        if awards_pp {
            return self.pp > previous.pp;
        }
        match (self.accuracy, previous.accuracy) {
            (Some(current), Some(prior)) => current > prior,
            _ => self.modified_score > previous.modified_score,
        }
    }
}

/// Score moved out of the current collection after being improved upon
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousScore {
    pub score: Score,
    pub archived_at: DateTime<Utc>,
}

/// Score joined with its leaderboard
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerScore {
    pub score: Score,
    pub leaderboard: Leaderboard,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyStats {
    pub average_ranked_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCounts {
    pub total_scores: i64,
    pub total_ranked_scores: i64,
    pub ranked_scores: i64,
    pub unranked_scores: i64,
    pub ranked_scores_improved: i64,
    pub unranked_scores_improved: i64,
}

/// One day of a player's standing. Keyed by (player, UTC date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatisticHistoryEntry {
    pub player_id: PlayerId,
    pub date: NaiveDate,
    pub rank: Option<i64>,
    pub country_rank: Option<i64>,
    pub pp: f64,
    pub plus_one_pp: Option<f64>,
    pub accuracy: AccuracyStats,
    pub scores: ScoreCounts,
}

/// Day-over-day movement; positive rank change means climbing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryChange {
    pub rank: Option<i64>,
    pub country_rank: Option<i64>,
    pub pp: f64,
    pub average_ranked_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyHistory {
    pub entry: PlayerStatisticHistoryEntry,
    pub change: Option<HistoryChange>,
}

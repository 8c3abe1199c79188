//! Raw JSON shapes returned by the ScoreSaber API. Nothing outside `api`
//! consumes these; parsers turn them into domain records.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataToken {
    pub total: i64,
    pub page: i64,
    pub items_per_page: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreStatsToken {
    #[serde(default)]
    pub total_score: i64,
    #[serde(default)]
    pub total_ranked_score: i64,
    #[serde(default)]
    pub average_ranked_accuracy: f64,
    #[serde(default)]
    pub total_play_count: i64,
    #[serde(default)]
    pub ranked_play_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerToken {
    pub id: String,
    pub name: String,
    pub country: Option<String>,
    #[serde(default)]
    pub pp: f64,
    #[serde(default)]
    pub rank: i64,
    #[serde(default)]
    pub country_rank: i64,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub inactive: bool,
    pub score_stats: Option<ScoreStatsToken>,
    pub first_seen: Option<String>,
}

/// Player info embedded in leaderboard score pages
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPlayerToken {
    pub id: String,
    pub name: String,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyToken {
    pub difficulty: i32,
    #[serde(default)]
    pub game_mode: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardToken {
    pub id: i64,
    pub song_hash: String,
    pub song_name: String,
    pub difficulty: DifficultyToken,
    #[serde(default)]
    pub max_score: i64,
    #[serde(default)]
    pub stars: f64,
    #[serde(default)]
    pub ranked: bool,
    #[serde(default)]
    pub qualified: bool,
    pub ranked_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreToken {
    pub id: i64,
    pub leaderboard_player_info: Option<LeaderboardPlayerToken>,
    pub base_score: i64,
    pub modified_score: i64,
    #[serde(default)]
    pub pp: f64,
    #[serde(default)]
    pub modifiers: String,
    #[serde(default)]
    pub bad_cuts: i32,
    #[serde(default)]
    pub missed_notes: i32,
    #[serde(default)]
    pub max_combo: i32,
    #[serde(default)]
    pub full_combo: bool,
    pub time_set: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScoreToken {
    pub score: ScoreToken,
    pub leaderboard: LeaderboardToken,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScoreCollectionToken {
    pub player_scores: Vec<PlayerScoreToken>,
    pub metadata: MetadataToken,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCollectionToken {
    pub scores: Vec<ScoreToken>,
    pub metadata: MetadataToken,
}

use std::time::Duration;

pub type ScoreRowId = i64;

/// A ranked score's contribution to a player's total
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedScore {
    pub score_id: ScoreRowId,
    pub pp: f64,
    pub weight: f64,
}

impl WeightedScore {
    pub fn weighted_pp(&self) -> f64 {
        self.pp * self.weight
    }
}

/// A player's ranked scores sorted by pp, best first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedScoreList {
    pub scores: Vec<WeightedScore>,
    pub total_pp: f64,
}

impl WeightedScoreList {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRankUpdate {
    pub score_id: ScoreRowId,
    pub rank: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeightUpdate {
    pub score_id: ScoreRowId,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorePpUpdate {
    pub score_id: ScoreRowId,
    pub accuracy: Option<f64>,
    pub pp: f64,
}

/// Result of re-ranking one leaderboard
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankRefresh {
    pub scores_count: usize,
    pub time_taken: Duration,
}

impl RankRefresh {
    pub fn empty() -> Self {
        Self {
            scores_count: 0,
            time_taken: Duration::ZERO,
        }
    }
}

pub mod boundary;
pub mod curve;
pub mod ranking;
pub mod types;
pub mod weighting;

pub use boundary::{PpBoundarySearch, plus_one_pp, pp_boundaries};
pub use curve::{accuracy_for_pp, get_pp, max_pp};
pub use ranking::assign_leaderboard_ranks;
pub use types::{
    RankRefresh, ScorePpUpdate, ScoreRankUpdate, ScoreWeightUpdate, WeightedScore,
    WeightedScoreList,
};
pub use weighting::{DECAY_FACTOR, compute_weight, weigh_scores};

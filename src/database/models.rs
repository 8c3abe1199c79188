// Row shapes that only exist on the storage side. Domain records live in `crate::domain`.

/// (player, leaderboard) pair holding more than one current score
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicatePair {
    pub player_id: String,
    pub leaderboard_id: i64,
    pub count: i64,
}

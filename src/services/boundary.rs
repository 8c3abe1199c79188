use log::debug;

use crate::config::BoundarySettings;
use crate::database::{self, DbPool, players, scores};
use crate::errors::{StatsError, StatsResult};
use crate::rating::pp_boundaries;

pub struct BoundaryService {
    pool: DbPool,
    settings: BoundarySettings,
}

impl BoundaryService {
    pub fn new(pool: DbPool, settings: BoundarySettings) -> Self {
        Self { pool, settings }
    }

    /// Raw pp a new score needs for +1 .. +`count` weighted pp, strictly
    /// increasing. Empty when the player has no pp-awarding scores.
    pub fn get_player_pp_boundary(
        &self,
        player_id: &str,
        count: Option<usize>,
    ) -> StatsResult<Vec<f64>> {
        let mut conn = database::get_connection(&self.pool)?;
        if players::find_by_id(&mut conn, player_id)?.is_none() {
            return Err(StatsError::not_found("player", player_id));
        }

        let pps: Vec<f64> = scores::list_player_scores(&mut conn, player_id)?
            .into_iter()
            .filter(|s| s.leaderboard.awards_pp())
            .map(|s| s.score.pp)
            .collect();

        let count = count.unwrap_or(self.settings.default_count);
        debug!(
            "Computing {} boundaries for player {} over {} scores",
            count,
            player_id,
            pps.len()
        );
        Ok(pp_boundaries(&pps, count))
    }
}

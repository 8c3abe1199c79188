use std::time::Instant;

use log::{error, info, warn};

use crate::database::{self, DbPool, leaderboards, players, scores};
use crate::domain::{BatchReport, LeaderboardId};
use crate::errors::{StatsError, StatsResult};
use crate::rating::weighting::weight_updates;
use crate::rating::{
    RankRefresh, ScorePpUpdate, WeightedScoreList, assign_leaderboard_ranks, weigh_scores,
};

/// Sole writer of the `rank`, `weight` and `pp` columns of current scores.
#[derive(Clone)]
pub struct RankingService {
    pool: DbPool,
}

impl RankingService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Re-ranks every score of a ranked leaderboard by modified score, highest
    /// first, and writes all ranks in one transaction.
    ///
    /// Leaderboards whose scores were never seeded are left untouched and yield
    /// an empty result.
    pub fn refresh_leaderboard_scores_rank(
        &self,
        leaderboard_id: LeaderboardId,
    ) -> StatsResult<RankRefresh> {
        let started = Instant::now();
        let mut conn = database::get_connection(&self.pool)?;

        let leaderboard = leaderboards::find_by_id(&mut conn, leaderboard_id)?
            .ok_or_else(|| StatsError::not_found("leaderboard", leaderboard_id))?;

        if !leaderboard.ranked {
            return Err(StatsError::InvalidState(format!(
                "leaderboard {} is not ranked",
                leaderboard_id
            )));
        }
        if !leaderboard.seeded_scores {
            info!("Leaderboard {} has no seeded scores, nothing to rank", leaderboard_id);
            return Ok(RankRefresh::empty());
        }

        let stored = scores::list_by_leaderboard(&mut conn, leaderboard_id)?;
        let updates = assign_leaderboard_ranks(&stored);
        scores::bulk_update_ranks(&mut conn, &updates)?;

        let refresh = RankRefresh {
            scores_count: updates.len(),
            time_taken: started.elapsed(),
        };
        info!(
            "  → Ranked {} scores on leaderboard {} in {:?}",
            refresh.scores_count, leaderboard_id, refresh.time_taken
        );
        Ok(refresh)
    }

    /// Sorts the player's pp-awarding scores and stores their decayed weights.
    /// Scores on leaderboards that award no pp get their weight cleared.
    pub fn recompute_player_weights(&self, player_id: &str) -> StatsResult<WeightedScoreList> {
        let mut conn = database::get_connection(&self.pool)?;
        let player_scores = scores::list_player_scores(&mut conn, player_id)?;

        if player_scores.is_empty() && players::find_by_id(&mut conn, player_id)?.is_none() {
            return Err(StatsError::not_found("player", player_id));
        }

        let (ranked, unranked): (Vec<_>, Vec<_>) = player_scores
            .iter()
            .partition(|s| s.leaderboard.awards_pp());

        let pps: Vec<(i64, f64)> = ranked.iter().map(|s| (s.score.id, s.score.pp)).collect();
        let unranked_ids: Vec<i64> = unranked.iter().map(|s| s.score.id).collect();

        let weighted = weigh_scores(&pps);
        scores::bulk_update_weights(&mut conn, &weight_updates(&weighted, &unranked_ids))?;

        info!(
            "  → Weighted {} ranked scores for player {} ({:.2}pp)",
            weighted.len(),
            player_id,
            weighted.total_pp
        );
        Ok(weighted)
    }

    /// Recomputes accuracy and pp of every score on a leaderboard from its
    /// current stars and max score, then re-weights every player holding one.
    pub fn reprocess_leaderboard_pp(&self, leaderboard_id: LeaderboardId) -> StatsResult<BatchReport> {
        let player_ids = {
            let mut conn = database::get_connection(&self.pool)?;
            let leaderboard = leaderboards::find_by_id(&mut conn, leaderboard_id)?
                .ok_or_else(|| StatsError::not_found("leaderboard", leaderboard_id))?;

            let stored = scores::list_by_leaderboard(&mut conn, leaderboard_id)?;
            let updates: Vec<ScorePpUpdate> = stored
                .iter()
                .map(|score| {
                    let accuracy = leaderboard.accuracy_of(score.modified_score);
                    ScorePpUpdate {
                        score_id: score.id,
                        accuracy,
                        pp: leaderboard.pp_for(accuracy),
                    }
                })
                .collect();
            scores::bulk_update_pp(&mut conn, &updates)?;
            info!(
                "  → Recomputed pp of {} scores on leaderboard {} ({:.2} stars)",
                updates.len(),
                leaderboard_id,
                leaderboard.stars
            );

            scores::list_player_ids_on_leaderboard(&mut conn, leaderboard_id)?
        };

        Ok(self.recompute_players(&player_ids))
    }

    /// Re-weights each player, recording failures instead of stopping.
    pub fn recompute_players(&self, player_ids: &[String]) -> BatchReport {
        let mut report = BatchReport::new();

        for player_id in player_ids {
            match self.recompute_player_weights(player_id) {
                Ok(_) => report.record_updated(),
                Err(e) if e.is_not_found() => {
                    warn!("Skipping weights for player {}: {}", player_id, e);
                    report.record_skipped();
                }
                Err(e) => {
                    error!("Failed to weight scores of player {}: {:#}", player_id, e);
                    report.record_failure(player_id, e);
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::get_connection;
    use crate::rating::{DECAY_FACTOR, get_pp};
    use crate::test_support::{leaderboard, new_score, temp_pool};

    fn seed_leaderboard(pool: &DbPool, id: i64, stars: f64, ranked: bool, seeded: bool) {
        let mut conn = get_connection(pool).unwrap();
        let mut lb = leaderboard(id, stars, ranked);
        lb.seeded_scores = seeded;
        leaderboards::upsert_leaderboard(&mut conn, &lb).unwrap();
    }

    fn add_score(pool: &DbPool, player: &str, lb: i64, modified: i64, pp: f64) -> i64 {
        let mut conn = get_connection(pool).unwrap();
        let mut score = new_score(player, lb, modified, 1);
        score.pp = pp;
        scores::insert_score(&mut conn, &score).unwrap().id
    }

    #[test]
    fn test_refresh_ranks_by_modified_score() {
        let (_dir, pool) = temp_pool();
        seed_leaderboard(&pool, 1, 5.0, true, true);
        add_score(&pool, "a", 1, 900, 0.0);
        add_score(&pool, "b", 1, 950, 0.0);
        add_score(&pool, "c", 1, 920, 0.0);

        let service = RankingService::new(pool.clone());
        let refresh = service.refresh_leaderboard_scores_rank(1).unwrap();
        assert_eq!(refresh.scores_count, 3);

        let mut conn = get_connection(&pool).unwrap();
        let ranks: Vec<(i64, Option<i64>)> = scores::list_by_leaderboard(&mut conn, 1)
            .unwrap()
            .into_iter()
            .map(|s| (s.modified_score, s.rank))
            .collect();
        assert_eq!(ranks, vec![(900, Some(3)), (950, Some(1)), (920, Some(2))]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let (_dir, pool) = temp_pool();
        seed_leaderboard(&pool, 1, 5.0, true, true);
        let first = add_score(&pool, "a", 1, 900, 0.0);
        let second = add_score(&pool, "b", 1, 900, 0.0);

        RankingService::new(pool.clone())
            .refresh_leaderboard_scores_rank(1)
            .unwrap();

        let mut conn = get_connection(&pool).unwrap();
        let stored = scores::list_by_leaderboard(&mut conn, 1).unwrap();
        assert_eq!((stored[0].id, stored[0].rank), (first, Some(1)));
        assert_eq!((stored[1].id, stored[1].rank), (second, Some(2)));
    }

    #[test]
    fn test_refresh_rejects_unranked_leaderboard() {
        let (_dir, pool) = temp_pool();
        seed_leaderboard(&pool, 1, 0.0, false, true);
        add_score(&pool, "a", 1, 900, 0.0);

        let err = RankingService::new(pool.clone())
            .refresh_leaderboard_scores_rank(1)
            .unwrap_err();
        assert!(matches!(err, StatsError::InvalidState(_)));
        assert_eq!(err.status_code(), 400);

        let mut conn = get_connection(&pool).unwrap();
        assert_eq!(scores::list_by_leaderboard(&mut conn, 1).unwrap()[0].rank, None);
    }

    #[test]
    fn test_refresh_without_seeded_scores_is_a_no_op() {
        let (_dir, pool) = temp_pool();
        seed_leaderboard(&pool, 1, 5.0, true, false);
        add_score(&pool, "a", 1, 900, 0.0);

        let refresh = RankingService::new(pool.clone())
            .refresh_leaderboard_scores_rank(1)
            .unwrap();
        assert_eq!(refresh, RankRefresh::empty());
    }

    #[test]
    fn test_refresh_unknown_leaderboard() {
        let (_dir, pool) = temp_pool();
        let err = RankingService::new(pool)
            .refresh_leaderboard_scores_rank(99)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_player_weights_follow_pp_order() {
        let (_dir, pool) = temp_pool();
        seed_leaderboard(&pool, 1, 5.0, true, true);
        seed_leaderboard(&pool, 2, 6.0, true, true);
        seed_leaderboard(&pool, 3, 7.0, true, true);
        seed_leaderboard(&pool, 4, 0.0, false, true);
        let low = add_score(&pool, "p1", 1, 900, 300.0);
        let high = add_score(&pool, "p1", 2, 900, 500.0);
        let mid = add_score(&pool, "p1", 3, 900, 400.0);
        let unranked = add_score(&pool, "p1", 4, 900, 0.0);

        let weighted = RankingService::new(pool.clone())
            .recompute_player_weights("p1")
            .unwrap();
        let expected = 500.0 + 400.0 * DECAY_FACTOR + 300.0 * DECAY_FACTOR.powi(2);
        assert!((weighted.total_pp - expected).abs() < 1e-9);

        let mut conn = get_connection(&pool).unwrap();
        let weights: std::collections::HashMap<i64, Option<f64>> =
            scores::list_player_scores(&mut conn, "p1")
                .unwrap()
                .into_iter()
                .map(|s| (s.score.id, s.score.weight))
                .collect();
        assert_eq!(weights[&high], Some(1.0));
        assert_eq!(weights[&mid], Some(DECAY_FACTOR));
        assert_eq!(weights[&low], Some(DECAY_FACTOR.powi(2)));
        assert_eq!(weights[&unranked], None);
    }

    #[test]
    fn test_weights_for_unknown_player() {
        let (_dir, pool) = temp_pool();
        let err = RankingService::new(pool)
            .recompute_player_weights("ghost")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_recompute_players_skips_missing_and_records_failures() {
        let (_dir, pool) = temp_pool();
        seed_leaderboard(&pool, 1, 5.0, true, true);
        let broken = add_score(&pool, "broken", 1, 900, 200.0);
        add_score(&pool, "healthy", 1, 950, 300.0);
        get_connection(&pool)
            .unwrap()
            .execute("UPDATE scores SET pp = 'oops' WHERE id = ?1", [broken])
            .unwrap();

        let ids = ["ghost", "broken", "healthy"].map(String::from);
        let report = RankingService::new(pool.clone()).recompute_players(&ids);

        assert_eq!(report.processed, 3);
        assert_eq!((report.updated, report.skipped, report.failed), (1, 1, 1));
        assert!(report.errors[0].starts_with("broken:"));
    }

    #[test]
    fn test_reprocess_applies_new_stars() {
        let (_dir, pool) = temp_pool();
        seed_leaderboard(&pool, 1, 5.0, true, true);
        add_score(&pool, "p1", 1, 950, 1.0);
        add_score(&pool, "p2", 1, 900, 1.0);
        seed_leaderboard(&pool, 1, 8.0, true, true);

        let report = RankingService::new(pool.clone())
            .reprocess_leaderboard_pp(1)
            .unwrap();
        assert_eq!(report.updated, 2);
        assert_eq!(report.failed, 0);

        let mut conn = get_connection(&pool).unwrap();
        let stored = scores::list_by_leaderboard(&mut conn, 1).unwrap();
        assert!((stored[0].pp - get_pp(8.0, 95.0)).abs() < 1e-9);
        assert!((stored[1].pp - get_pp(8.0, 90.0)).abs() < 1e-9);
        assert_eq!(stored[0].weight, Some(1.0));
    }
}

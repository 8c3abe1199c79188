use std::collections::BTreeSet;

use chrono::Utc;
use log::{error, info, warn};

use crate::config::BatchSettings;
use crate::database::{self, DbPool, leaderboards, players, scores};
use crate::domain::{BatchProgress, BatchReport, LeaderboardId, PlayerId, PlayerScore};
use crate::errors::{StatsError, StatsResult};
use crate::rating::ScorePpUpdate;
use crate::services::ranking::RankingService;

/// Idempotent repairs over stored data. Each job walks its records in keyset
/// pages, skips records that are already migrated and records failures
/// without stopping.
pub struct MigrationService {
    pool: DbPool,
    batch: BatchSettings,
    ranking: RankingService,
}

impl MigrationService {
    pub fn new(pool: DbPool, batch: BatchSettings) -> Self {
        Self {
            ranking: RankingService::new(pool.clone()),
            pool,
            batch,
        }
    }

    pub fn run_all(&self) -> StatsResult<BatchReport> {
        let mut report = self.backfill_joined_dates()?;
        report.merge(self.split_duplicate_scores()?);
        report.merge(self.backfill_rank_fields()?);
        report.merge(self.backfill_accuracy()?);
        Ok(report)
    }

    /// Players without a joined date get their first-seen date, or else the
    /// timestamp of their oldest stored play.
    pub fn backfill_joined_dates(&self) -> StatsResult<BatchReport> {
        let mut conn = database::get_connection(&self.pool)?;
        let total = players::count_missing_joined_date(&mut conn)?;
        info!("=== Backfilling joined dates ({} players) ===", total);

        let mut report = BatchReport::new();
        let mut progress = BatchProgress::new("joined-dates", self.batch.progress_every);
        let mut cursor = String::new();

        loop {
            let page = players::list_ids_missing_joined_date(&mut conn, &cursor, self.batch.batch_size)?;
            let Some(last) = page.last() else { break };
            cursor = last.clone();

            for player_id in &page {
                match backfill_joined_date(&mut conn, player_id) {
                    Ok(true) => report.record_updated(),
                    Ok(false) => report.record_skipped(),
                    Err(e) => {
                        error!("Failed to backfill joined date of {}: {:#}", player_id, e);
                        report.record_failure(player_id, e);
                    }
                }
                progress.observe(&report);
            }
        }

        progress.finish(&report);
        Ok(report)
    }

    /// Keeps only the most recent current score per (player, leaderboard) and
    /// moves the rest into previous scores.
    pub fn split_duplicate_scores(&self) -> StatsResult<BatchReport> {
        info!("=== Splitting duplicate scores ===");

        let mut report = BatchReport::new();
        let mut progress = BatchProgress::new("split-scores", self.batch.progress_every);
        let mut affected_players = BTreeSet::new();
        let mut affected_leaderboards = BTreeSet::new();
        let mut cursor: (PlayerId, LeaderboardId) = (String::new(), i64::MIN);

        loop {
            let page = {
                let mut conn = database::get_connection(&self.pool)?;
                scores::list_duplicate_pairs(&mut conn, (&cursor.0, cursor.1), self.batch.batch_size)?
            };
            let Some(last) = page.last() else { break };
            cursor = (last.player_id.clone(), last.leaderboard_id);

            for pair in &page {
                let key = format!("{}/{}", pair.player_id, pair.leaderboard_id);
                match self.split_pair(&pair.player_id, pair.leaderboard_id) {
                    Ok(0) => report.record_skipped(),
                    Ok(archived) => {
                        info!("  → {}: archived {} older scores", key, archived);
                        affected_players.insert(pair.player_id.clone());
                        affected_leaderboards.insert(pair.leaderboard_id);
                        report.record_updated();
                    }
                    Err(e) => {
                        error!("Failed to split scores of {}: {:#}", key, e);
                        report.record_failure(&key, e);
                    }
                }
                progress.observe(&report);
            }
        }

        self.repair_players(&affected_players, &mut report);
        self.repair_ranks(&affected_leaderboards, &mut report);
        progress.finish(&report);
        Ok(report)
    }

    /// Re-ranks seeded leaderboards with unranked scores and re-weights players
    /// with unweighted pp-awarding scores.
    pub fn backfill_rank_fields(&self) -> StatsResult<BatchReport> {
        info!("=== Backfilling rank and weight fields ===");

        let mut report = BatchReport::new();
        let mut progress = BatchProgress::new("rank-fields", self.batch.progress_every);

        let mut leaderboard_cursor = LeaderboardId::MIN;
        loop {
            let page = {
                let mut conn = database::get_connection(&self.pool)?;
                leaderboards::list_ids_missing_ranks(&mut conn, leaderboard_cursor, self.batch.batch_size)?
            };
            let Some(&last) = page.last() else { break };
            leaderboard_cursor = last;

            for &leaderboard_id in &page {
                match self.ranking.refresh_leaderboard_scores_rank(leaderboard_id) {
                    Ok(_) => report.record_updated(),
                    Err(e) => {
                        error!("Failed to rank leaderboard {}: {:#}", leaderboard_id, e);
                        report.record_failure(&format!("leaderboard {}", leaderboard_id), e);
                    }
                }
                progress.observe(&report);
            }
        }

        let mut player_cursor = String::new();
        loop {
            let page = {
                let mut conn = database::get_connection(&self.pool)?;
                scores::list_players_missing_weights(&mut conn, &player_cursor, self.batch.batch_size)?
            };
            let Some(last) = page.last() else { break };
            player_cursor = last.clone();

            report.merge(self.ranking.recompute_players(&page));
            progress.observe(&report);
        }

        progress.finish(&report);
        Ok(report)
    }

    /// Fills accuracy and pp of scores stored before their leaderboard's max
    /// score was known, then re-weights the affected players.
    pub fn backfill_accuracy(&self) -> StatsResult<BatchReport> {
        info!("=== Backfilling score accuracy ===");

        let mut report = BatchReport::new();
        let mut progress = BatchProgress::new("accuracy", self.batch.progress_every);
        let mut affected_players = BTreeSet::new();
        let mut cursor = 0;

        loop {
            let mut conn = database::get_connection(&self.pool)?;
            let page = scores::list_ids_missing_accuracy(&mut conn, cursor, self.batch.batch_size)?;
            let Some(&last) = page.last() else { break };
            cursor = last;

            let mut updates = Vec::with_capacity(page.len());
            let mut owners = Vec::with_capacity(page.len());
            for &score_id in &page {
                match scores::find_player_score(&mut conn, score_id) {
                    Ok(Some(loaded)) => {
                        updates.push(pp_update(&loaded));
                        owners.push(loaded.score.player_id);
                    }
                    Ok(None) => report.record_skipped(),
                    Err(e) => {
                        error!("Failed to load score {}: {:#}", score_id, e);
                        report.record_failure(&format!("score {}", score_id), e);
                    }
                }
            }

            match scores::bulk_update_pp(&mut conn, &updates) {
                Ok(_) => {
                    for _ in &updates {
                        report.record_updated();
                    }
                    affected_players.extend(owners);
                }
                Err(e) => {
                    error!("Failed to update accuracy page ending at score {}: {:#}", cursor, e);
                    for update in &updates {
                        report.record_failure(&format!("score {}", update.score_id), &e);
                    }
                }
            }
            progress.observe(&report);
        }

        self.repair_players(&affected_players, &mut report);
        progress.finish(&report);
        Ok(report)
    }

    fn split_pair(&self, player_id: &str, leaderboard_id: LeaderboardId) -> StatsResult<usize> {
        let mut conn = database::get_connection(&self.pool)?;
        let current = scores::list_for_pair(&mut conn, player_id, leaderboard_id)?;

        // newest first, so everything after the head is an older play
        let Some((_, older)) = current.split_first() else {
            return Ok(0);
        };
        Ok(scores::archive_scores(&mut conn, older, Utc::now())?)
    }

    // Follow-up writes are logged only; they do not count as migrated records.
    fn repair_players(&self, player_ids: &BTreeSet<PlayerId>, report: &mut BatchReport) {
        let ids: Vec<PlayerId> = player_ids.iter().cloned().collect();
        let follow_up = self.ranking.recompute_players(&ids);
        if follow_up.failed > 0 {
            warn!("{} players could not be re-weighted", follow_up.failed);
            report.errors.extend(follow_up.errors);
        }
    }

    fn repair_ranks(&self, leaderboard_ids: &BTreeSet<LeaderboardId>, report: &mut BatchReport) {
        for &leaderboard_id in leaderboard_ids {
            match self.ranking.refresh_leaderboard_scores_rank(leaderboard_id) {
                Ok(_) => {}
                // unranked and unknown leaderboards carry no ranks to repair
                Err(e) if e.is_not_found() || matches!(e, StatsError::InvalidState(_)) => {}
                Err(e) => {
                    warn!("Failed to re-rank leaderboard {}: {:#}", leaderboard_id, e);
                    report.errors.push(format!("leaderboard {}: {}", leaderboard_id, e));
                }
            }
        }
    }
}

fn backfill_joined_date(conn: &mut database::DbConn, player_id: &str) -> anyhow::Result<bool> {
    let Some(player) = players::find_by_id(conn, player_id)? else {
        return Ok(false);
    };

    let joined = match player.first_seen {
        Some(first_seen) => Some(first_seen),
        None => scores::earliest_timestamp(conn, &player.id)?,
    };

    match joined {
        Some(joined) => players::set_joined_date(conn, &player.id, joined),
        None => Ok(false),
    }
}

fn pp_update(stored: &PlayerScore) -> ScorePpUpdate {
    let accuracy = stored.leaderboard.accuracy_of(stored.score.modified_score);
    ScorePpUpdate {
        score_id: stored.score.id,
        accuracy,
        pp: stored.leaderboard.pp_for(accuracy),
    }
}

use chrono::{NaiveDate, Utc};
use log::{error, info, warn};

use crate::config::BatchSettings;
use crate::database::{self, DbPool, history, players, previous_scores, scores};
use crate::domain::{
    BatchProgress, BatchReport, DailyHistory, HistoryInput, PlayerId, build_history_entry,
};
use crate::errors::{StatsError, StatsResult};

pub struct HistoryService {
    pool: DbPool,
    batch: BatchSettings,
}

impl HistoryService {
    pub fn new(pool: DbPool, batch: BatchSettings) -> Self {
        Self { pool, batch }
    }

    /// Builds and stores the player's entry for `date`. Running it again for the
    /// same day overwrites the stored entry.
    pub fn build_daily_history_entry(
        &self,
        player_id: &str,
        date: NaiveDate,
    ) -> StatsResult<DailyHistory> {
        let mut conn = database::get_connection(&self.pool)?;

        let player = players::find_by_id(&mut conn, player_id)?
            .ok_or_else(|| StatsError::not_found("player", player_id))?;
        let current = scores::list_player_scores(&mut conn, player_id)?;
        let previous = previous_scores::list_by_player(&mut conn, player_id)?;
        let previous_entry = match date.pred_opt() {
            Some(day_before) => history::find_entry(&mut conn, player_id, day_before)?,
            None => None,
        };

        let input = HistoryInput {
            player: &player,
            scores: &current,
            previous_scores: &previous,
            previous_entry: previous_entry.as_ref(),
        };
        let daily = build_history_entry(date, &input);
        history::upsert_entry(&mut conn, &daily.entry, Utc::now())?;

        Ok(daily)
    }

    /// Builds `date` for every stored player. Pages carry ids only, each player
    /// is loaded on its own, so a missing player is skipped and an unreadable
    /// one is recorded as a failure; neither stops the run.
    pub fn run_daily(&self, date: NaiveDate) -> StatsResult<BatchReport> {
        let total = {
            let mut conn = database::get_connection(&self.pool)?;
            players::count_players(&mut conn)?
        };
        info!("=== Building history for {} ({} players) ===", date, total);

        let mut report = BatchReport::new();
        let mut progress = BatchProgress::new("history", self.batch.progress_every);
        let mut cursor = String::new();

        loop {
            let page = self.next_player_page(&cursor)?;
            let Some(last) = page.last() else { break };
            cursor = last.clone();

            for player_id in &page {
                self.build_one(player_id, date, &mut report);
                progress.observe(&report);
            }
        }

        progress.finish(&report);
        Ok(report)
    }

    fn next_player_page(&self, cursor: &str) -> StatsResult<Vec<PlayerId>> {
        let mut conn = database::get_connection(&self.pool)?;
        Ok(players::list_ids(&mut conn, cursor, self.batch.batch_size)?)
    }

    fn build_one(&self, player_id: &str, date: NaiveDate, report: &mut BatchReport) {
        match self.build_daily_history_entry(player_id, date) {
            Ok(_) => report.record_updated(),
            Err(e) if e.is_not_found() => {
                warn!("Skipping history for {}: {}", player_id, e);
                report.record_skipped();
            }
            Err(e) => {
                error!("Failed to build history for {}: {:#}", player_id, e);
                report.record_failure(player_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{get_connection, leaderboards};
    use crate::test_support::{leaderboard, new_score, player, temp_pool};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn seeded_service() -> (tempfile::TempDir, DbPool, HistoryService) {
        let (dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();
        players::upsert_player(&mut conn, &player("p1")).unwrap();
        players::upsert_player(&mut conn, &player("p2")).unwrap();
        leaderboards::upsert_leaderboard(&mut conn, &leaderboard(1, 6.0, true)).unwrap();

        let mut score = new_score("p1", 1, 950, 10);
        score.pp = 320.0;
        scores::insert_score(&mut conn, &score).unwrap();
        drop(conn);

        let service = HistoryService::new(pool.clone(), BatchSettings::default());
        (dir, pool, service)
    }

    #[test]
    fn test_rebuilding_the_same_day_keeps_one_entry() {
        let (_dir, pool, service) = seeded_service();

        service.build_daily_history_entry("p1", day()).unwrap();

        let mut conn = get_connection(&pool).unwrap();
        let mut updated = player("p1");
        updated.pp = 4_300.0;
        players::upsert_player(&mut conn, &updated).unwrap();

        let second = service.build_daily_history_entry("p1", day()).unwrap();
        let stored = history::list_for_player(&mut conn, "p1").unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], second.entry);
        assert_eq!(stored[0].pp, 4_300.0);
        assert_eq!(stored[0].scores.ranked_scores, 1);
    }

    #[test]
    fn test_change_uses_the_previous_day() {
        let (_dir, _pool, service) = seeded_service();

        let first = service.build_daily_history_entry("p1", day()).unwrap();
        assert!(first.change.is_none());

        let next = service
            .build_daily_history_entry("p1", day().succ_opt().unwrap())
            .unwrap();
        let change = next.change.unwrap();
        assert_eq!(change.rank, Some(0));
        assert_eq!(change.pp, 0.0);
    }

    #[test]
    fn test_missing_player_is_not_found() {
        let (_dir, _pool, service) = seeded_service();
        let err = service.build_daily_history_entry("ghost", day()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_daily_run_covers_every_player() {
        let (_dir, pool, _) = seeded_service();
        let service = HistoryService::new(
            pool.clone(),
            BatchSettings {
                batch_size: 1,
                progress_every: 1,
            },
        );

        let report = service.run_daily(day()).unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.updated, 2);
        assert_eq!(report.failed, 0);

        let mut conn = get_connection(&pool).unwrap();
        assert!(history::find_entry(&mut conn, "p2", day()).unwrap().is_some());
    }

    #[test]
    fn test_daily_run_continues_past_unreadable_player() {
        let (_dir, pool, _) = seeded_service();
        let mut conn = get_connection(&pool).unwrap();
        players::upsert_player(&mut conn, &player("p3")).unwrap();
        conn.execute("UPDATE players SET pp = 'oops' WHERE id = 'p2'", [])
            .unwrap();
        drop(conn);

        let service = HistoryService::new(
            pool.clone(),
            BatchSettings {
                batch_size: 1,
                progress_every: 1,
            },
        );
        let report = service.run_daily(day()).unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(report.updated, 2);
        assert_eq!(report.failed, 1);
        assert!(report.errors[0].starts_with("p2"));

        let mut conn = get_connection(&pool).unwrap();
        assert!(history::find_entry(&mut conn, "p3", day()).unwrap().is_some());
        assert!(history::find_entry(&mut conn, "p2", day()).unwrap().is_none());
    }
}

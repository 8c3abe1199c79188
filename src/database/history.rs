use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{OptionalExtension, params};

use super::connection::DbConn;
use crate::domain::{AccuracyStats, PlayerStatisticHistoryEntry, ScoreCounts};

const HISTORY_COLUMNS: &str = "player_id, date, rank, country_rank, pp, plus_one_pp, average_ranked_accuracy, total_scores, total_ranked_scores, ranked_scores, unranked_scores, ranked_scores_improved, unranked_scores_improved";

/// Writes the entry for its (player, date) key, overwriting any earlier write
/// for the same day.
pub fn upsert_entry(
    conn: &mut DbConn,
    entry: &PlayerStatisticHistoryEntry,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    let sql = "INSERT INTO player_history (player_id, date, rank, country_rank, pp, plus_one_pp, average_ranked_accuracy, total_scores, total_ranked_scores, ranked_scores, unranked_scores, ranked_scores_improved, unranked_scores_improved, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ON CONFLICT(player_id, date) DO UPDATE SET
            rank = excluded.rank,
            country_rank = excluded.country_rank,
            pp = excluded.pp,
            plus_one_pp = excluded.plus_one_pp,
            average_ranked_accuracy = excluded.average_ranked_accuracy,
            total_scores = excluded.total_scores,
            total_ranked_scores = excluded.total_ranked_scores,
            ranked_scores = excluded.ranked_scores,
            unranked_scores = excluded.unranked_scores,
            ranked_scores_improved = excluded.ranked_scores_improved,
            unranked_scores_improved = excluded.unranked_scores_improved,
            updated_at = excluded.updated_at";

    conn.execute(
        sql,
        params![
            entry.player_id,
            entry.date,
            entry.rank,
            entry.country_rank,
            entry.pp,
            entry.plus_one_pp,
            entry.accuracy.average_ranked_accuracy,
            entry.scores.total_scores,
            entry.scores.total_ranked_scores,
            entry.scores.ranked_scores,
            entry.scores.unranked_scores,
            entry.scores.ranked_scores_improved,
            entry.scores.unranked_scores_improved,
            updated_at,
        ],
    )
    .with_context(|| {
        format!(
            "Failed to upsert history of player {} for {}",
            entry.player_id, entry.date
        )
    })?;

    Ok(())
}

pub fn find_entry(
    conn: &mut DbConn,
    player_id: &str,
    date: NaiveDate,
) -> Result<Option<PlayerStatisticHistoryEntry>> {
    let sql = format!(
        "SELECT {} FROM player_history WHERE player_id = ?1 AND date = ?2",
        HISTORY_COLUMNS
    );

    conn.query_row(&sql, params![player_id, date], parse_history_row)
        .optional()
        .context("Failed to query history entry")
}

pub fn list_for_player(
    conn: &mut DbConn,
    player_id: &str,
) -> Result<Vec<PlayerStatisticHistoryEntry>> {
    let sql = format!(
        "SELECT {} FROM player_history WHERE player_id = ?1 ORDER BY date",
        HISTORY_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![player_id], parse_history_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

fn parse_history_row(row: &rusqlite::Row) -> rusqlite::Result<PlayerStatisticHistoryEntry> {
    Ok(PlayerStatisticHistoryEntry {
        player_id: row.get(0)?,
        date: row.get(1)?,
        rank: row.get(2)?,
        country_rank: row.get(3)?,
        pp: row.get(4)?,
        plus_one_pp: row.get(5)?,
        accuracy: AccuracyStats {
            average_ranked_accuracy: row.get(6)?,
        },
        scores: ScoreCounts {
            total_scores: row.get(7)?,
            total_ranked_scores: row.get(8)?,
            ranked_scores: row.get(9)?,
            unranked_scores: row.get(10)?,
            ranked_scores_improved: row.get(11)?,
            unranked_scores_improved: row.get(12)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::get_connection;
    use crate::test_support::{at, temp_pool};

    fn entry(date: NaiveDate, pp: f64) -> PlayerStatisticHistoryEntry {
        PlayerStatisticHistoryEntry {
            player_id: "p1".to_string(),
            date,
            rank: Some(100),
            country_rank: Some(5),
            pp,
            plus_one_pp: Some(412.5),
            accuracy: AccuracyStats {
                average_ranked_accuracy: Some(93.1),
            },
            scores: ScoreCounts {
                total_scores: 10,
                ranked_scores: 2,
                ..ScoreCounts::default()
            },
        }
    }

    #[test]
    fn test_same_day_upsert_overwrites() {
        let (_dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        upsert_entry(&mut conn, &entry(day, 1000.0), at(2024, 5, 1, 1)).unwrap();
        upsert_entry(&mut conn, &entry(day, 1010.0), at(2024, 5, 1, 2)).unwrap();

        let all = list_for_player(&mut conn, "p1").unwrap();
        assert_eq!(all, vec![entry(day, 1010.0)]);
    }

    #[test]
    fn test_entries_are_keyed_by_player_and_date() {
        let (_dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let older = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        upsert_entry(&mut conn, &entry(older, 990.0), at(2024, 5, 1, 1)).unwrap();
        upsert_entry(&mut conn, &entry(day, 1000.0), at(2024, 5, 3, 1)).unwrap();

        assert_eq!(find_entry(&mut conn, "p1", older).unwrap().unwrap().pp, 990.0);
        assert!(find_entry(&mut conn, "p1", day.pred_opt().unwrap()).unwrap().is_none());
        assert!(find_entry(&mut conn, "p2", day).unwrap().is_none());
        assert_eq!(list_for_player(&mut conn, "p1").unwrap().len(), 2);
    }
}

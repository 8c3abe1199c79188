use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::connection::DbConn;
use super::leaderboards::{LEADERBOARD_COLUMNS, parse_leaderboard_row};
use super::models::DuplicatePair;
use super::previous_scores;
use crate::domain::{LeaderboardId, NewScore, PlayerScore, Score};
use crate::rating::{ScorePpUpdate, ScoreRankUpdate, ScoreWeightUpdate};

pub(super) const SCORE_COLUMNS: &str = "s.id, s.score_id, s.player_id, s.leaderboard_id, s.base_score, s.modified_score, s.accuracy, s.pp, s.weight, s.rank, s.modifiers, s.misses, s.bad_cuts, s.max_combo, s.full_combo, s.timestamp";
pub(super) const SCORE_COLUMN_COUNT: usize = 16;

pub fn insert_score(conn: &mut DbConn, score: &NewScore) -> Result<Score> {
    insert_on(conn, score).with_context(|| {
        format!(
            "Failed to insert score {} for player {}",
            score.score_id, score.player_id
        )
    })
}

fn insert_on(conn: &Connection, score: &NewScore) -> rusqlite::Result<Score> {
    let sql = "INSERT INTO scores (score_id, player_id, leaderboard_id, base_score, modified_score, accuracy, pp, modifiers, misses, bad_cuts, max_combo, full_combo, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        RETURNING id, score_id, player_id, leaderboard_id, base_score, modified_score, accuracy, pp, weight, rank, modifiers, misses, bad_cuts, max_combo, full_combo, timestamp";

    conn.query_row(
        sql,
        params![
            score.score_id,
            score.player_id,
            score.leaderboard_id,
            score.base_score,
            score.modified_score,
            score.accuracy,
            score.pp,
            score.modifiers,
            score.misses,
            score.bad_cuts,
            score.max_combo,
            score.full_combo,
            score.timestamp,
        ],
        |row| parse_score_row(row, 0),
    )
}

/// Most recent current score of a player on a leaderboard.
pub fn find_latest_for_pair(
    conn: &mut DbConn,
    player_id: &str,
    leaderboard_id: LeaderboardId,
) -> Result<Option<Score>> {
    let sql = format!(
        "SELECT {} FROM scores s WHERE s.player_id = ?1 AND s.leaderboard_id = ?2 ORDER BY s.timestamp DESC, s.id DESC LIMIT 1",
        SCORE_COLUMNS
    );

    conn.query_row(&sql, params![player_id, leaderboard_id], |row| {
        parse_score_row(row, 0)
    })
    .optional()
    .context("Failed to query score by player and leaderboard")
}

/// Every current score of a player on a leaderboard, newest first.
pub fn list_for_pair(
    conn: &mut DbConn,
    player_id: &str,
    leaderboard_id: LeaderboardId,
) -> Result<Vec<Score>> {
    let sql = format!(
        "SELECT {} FROM scores s WHERE s.player_id = ?1 AND s.leaderboard_id = ?2 ORDER BY s.timestamp DESC, s.id DESC",
        SCORE_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![player_id, leaderboard_id], |row| {
            parse_score_row(row, 0)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Moves `current` into previous scores and stores `replacement` in its place,
/// all in one transaction.
pub fn archive_and_replace(
    conn: &mut DbConn,
    current: &Score,
    replacement: &NewScore,
    archived_at: DateTime<Utc>,
) -> Result<Score> {
    let tx = conn
        .transaction()
        .context("Failed to begin score replacement")?;

    previous_scores::insert_on(&tx, current, archived_at)
        .context("Failed to archive replaced score")?;
    tx.execute("DELETE FROM scores WHERE id = ?1", params![current.id])
        .context("Failed to delete replaced score")?;
    let stored = insert_on(&tx, replacement).context("Failed to insert replacement score")?;

    tx.commit().context("Failed to commit score replacement")?;
    Ok(stored)
}

/// Moves the given scores into previous scores in one transaction.
pub fn archive_scores(
    conn: &mut DbConn,
    scores: &[Score],
    archived_at: DateTime<Utc>,
) -> Result<usize> {
    let tx = conn.transaction().context("Failed to begin score archive")?;

    for score in scores {
        previous_scores::insert_on(&tx, score, archived_at)
            .with_context(|| format!("Failed to archive score {}", score.id))?;
        tx.execute("DELETE FROM scores WHERE id = ?1", params![score.id])
            .with_context(|| format!("Failed to delete archived score {}", score.id))?;
    }

    tx.commit().context("Failed to commit score archive")?;
    Ok(scores.len())
}

/// Scores of a leaderboard in insertion order.
pub fn list_by_leaderboard(conn: &mut DbConn, leaderboard_id: LeaderboardId) -> Result<Vec<Score>> {
    let sql = format!(
        "SELECT {} FROM scores s WHERE s.leaderboard_id = ?1 ORDER BY s.id",
        SCORE_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![leaderboard_id], |row| parse_score_row(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Current scores of a player joined with their leaderboards.
pub fn list_player_scores(conn: &mut DbConn, player_id: &str) -> Result<Vec<PlayerScore>> {
    let sql = format!(
        "SELECT {}, {} FROM scores s JOIN leaderboards l ON l.id = s.leaderboard_id WHERE s.player_id = ?1 ORDER BY s.id",
        SCORE_COLUMNS, LEADERBOARD_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![player_id], parse_player_score_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn list_player_ids_on_leaderboard(
    conn: &mut DbConn,
    leaderboard_id: LeaderboardId,
) -> Result<Vec<String>> {
    let sql = "SELECT DISTINCT player_id FROM scores WHERE leaderboard_id = ?1 ORDER BY player_id";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![leaderboard_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn bulk_update_ranks(conn: &mut DbConn, updates: &[ScoreRankUpdate]) -> Result<usize> {
    let tx = conn.transaction().context("Failed to begin rank update")?;
    {
        let mut stmt = tx.prepare("UPDATE scores SET rank = ?1 WHERE id = ?2")?;
        for update in updates {
            stmt.execute(params![update.rank, update.score_id])
                .with_context(|| format!("Failed to update rank of score {}", update.score_id))?;
        }
    }
    tx.commit().context("Failed to commit rank update")?;

    Ok(updates.len())
}

pub fn bulk_update_weights(conn: &mut DbConn, updates: &[ScoreWeightUpdate]) -> Result<usize> {
    let tx = conn.transaction().context("Failed to begin weight update")?;
    {
        let mut stmt = tx.prepare("UPDATE scores SET weight = ?1 WHERE id = ?2")?;
        for update in updates {
            stmt.execute(params![update.weight, update.score_id])
                .with_context(|| format!("Failed to update weight of score {}", update.score_id))?;
        }
    }
    tx.commit().context("Failed to commit weight update")?;

    Ok(updates.len())
}

pub fn bulk_update_pp(conn: &mut DbConn, updates: &[ScorePpUpdate]) -> Result<usize> {
    let tx = conn.transaction().context("Failed to begin pp update")?;
    {
        let mut stmt = tx.prepare("UPDATE scores SET accuracy = ?1, pp = ?2 WHERE id = ?3")?;
        for update in updates {
            stmt.execute(params![update.accuracy, update.pp, update.score_id])
                .with_context(|| format!("Failed to update pp of score {}", update.score_id))?;
        }
    }
    tx.commit().context("Failed to commit pp update")?;

    Ok(updates.len())
}

/// Keyset page of (player, leaderboard) pairs holding more than one current score.
pub fn list_duplicate_pairs(
    conn: &mut DbConn,
    after: (&str, LeaderboardId),
    limit: usize,
) -> Result<Vec<DuplicatePair>> {
    let sql = "SELECT player_id, leaderboard_id, COUNT(*) FROM scores
        GROUP BY player_id, leaderboard_id
        HAVING COUNT(*) > 1 AND (player_id, leaderboard_id) > (?1, ?2)
        ORDER BY player_id, leaderboard_id LIMIT ?3";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![after.0, after.1, limit as i64], |row| {
            Ok(DuplicatePair {
                player_id: row.get(0)?,
                leaderboard_id: row.get(1)?,
                count: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Timestamp of the player's oldest play, current or archived.
pub fn earliest_timestamp(conn: &mut DbConn, player_id: &str) -> Result<Option<DateTime<Utc>>> {
    let sql = "SELECT MIN(timestamp) FROM (
            SELECT timestamp FROM scores WHERE player_id = ?1
            UNION ALL
            SELECT timestamp FROM previous_scores WHERE player_id = ?1
        )";

    conn.query_row(sql, params![player_id], |row| row.get(0))
        .context("Failed to query earliest score timestamp")
}

/// Ids of scores without accuracy whose leaderboard now has a max score.
pub fn list_ids_missing_accuracy(
    conn: &mut DbConn,
    after_id: i64,
    limit: usize,
) -> Result<Vec<i64>> {
    let sql = "SELECT s.id FROM scores s JOIN leaderboards l ON l.id = s.leaderboard_id
         WHERE s.accuracy IS NULL AND l.max_score > 0 AND s.id > ?1
         ORDER BY s.id LIMIT ?2";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![after_id, limit as i64], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// One score joined with its leaderboard.
pub fn find_player_score(conn: &mut DbConn, id: i64) -> Result<Option<PlayerScore>> {
    let sql = format!(
        "SELECT {}, {} FROM scores s JOIN leaderboards l ON l.id = s.leaderboard_id WHERE s.id = ?1",
        SCORE_COLUMNS, LEADERBOARD_COLUMNS
    );

    conn.query_row(&sql, params![id], parse_player_score_row)
        .optional()
        .with_context(|| format!("Failed to load score {}", id))
}

/// Players with a pp-awarding score that has no weight yet.
pub fn list_players_missing_weights(
    conn: &mut DbConn,
    after: &str,
    limit: usize,
) -> Result<Vec<String>> {
    let sql = "SELECT DISTINCT s.player_id FROM scores s JOIN leaderboards l ON l.id = s.leaderboard_id
        WHERE s.weight IS NULL AND l.ranked = 1 AND l.stars > 0 AND s.player_id > ?1
        ORDER BY s.player_id LIMIT ?2";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![after, limit as i64], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub(super) fn parse_score_row(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Score> {
    Ok(Score {
        id: row.get(offset)?,
        score_id: row.get(offset + 1)?,
        player_id: row.get(offset + 2)?,
        leaderboard_id: row.get(offset + 3)?,
        base_score: row.get(offset + 4)?,
        modified_score: row.get(offset + 5)?,
        accuracy: row.get(offset + 6)?,
        pp: row.get(offset + 7)?,
        weight: row.get(offset + 8)?,
        rank: row.get(offset + 9)?,
        modifiers: row.get(offset + 10)?,
        misses: row.get(offset + 11)?,
        bad_cuts: row.get(offset + 12)?,
        max_combo: row.get(offset + 13)?,
        full_combo: row.get(offset + 14)?,
        timestamp: row.get(offset + 15)?,
    })
}

fn parse_player_score_row(row: &rusqlite::Row) -> rusqlite::Result<PlayerScore> {
    Ok(PlayerScore {
        score: parse_score_row(row, 0)?,
        leaderboard: parse_leaderboard_row(row, SCORE_COLUMN_COUNT)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{get_connection, leaderboards};
    use crate::test_support::{at, leaderboard, new_score, temp_pool};

    #[test]
    fn test_insert_keeps_insertion_order() {
        let (_dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();

        let first = insert_score(&mut conn, &new_score("p1", 1, 900, 1)).unwrap();
        let second = insert_score(&mut conn, &new_score("p2", 1, 950, 2)).unwrap();
        assert!(first.id < second.id);
        assert_eq!(second.rank, None);
        assert_eq!(second.weight, None);

        let listed = list_by_leaderboard(&mut conn, 1).unwrap();
        assert_eq!(listed, vec![first, second]);
    }

    #[test]
    fn test_archive_and_replace_moves_old_score() {
        let (_dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();

        let old = insert_score(&mut conn, &new_score("p1", 1, 900, 1)).unwrap();
        let new = archive_and_replace(&mut conn, &old, &new_score("p1", 1, 940, 5), at(2024, 5, 1, 6))
            .unwrap();

        let current = list_for_pair(&mut conn, "p1", 1).unwrap();
        assert_eq!(current, vec![new]);

        let archived = previous_scores::list_by_player(&mut conn, "p1").unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].score.modified_score, 900);
        assert_eq!(archived[0].archived_at, at(2024, 5, 1, 6));
    }

    #[test]
    fn test_bulk_updates_touch_only_listed_rows() {
        let (_dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();
        let a = insert_score(&mut conn, &new_score("p1", 1, 900, 1)).unwrap();
        let b = insert_score(&mut conn, &new_score("p2", 1, 950, 2)).unwrap();

        bulk_update_ranks(&mut conn, &[ScoreRankUpdate { score_id: b.id, rank: 1 }]).unwrap();
        bulk_update_weights(&mut conn, &[ScoreWeightUpdate { score_id: a.id, weight: Some(0.965) }])
            .unwrap();
        bulk_update_pp(
            &mut conn,
            &[ScorePpUpdate { score_id: a.id, accuracy: Some(90.0), pp: 123.0 }],
        )
        .unwrap();

        let listed = list_by_leaderboard(&mut conn, 1).unwrap();
        assert_eq!(listed[0].rank, None);
        assert_eq!(listed[0].weight, Some(0.965));
        assert_eq!(listed[0].pp, 123.0);
        assert_eq!(listed[1].rank, Some(1));
        assert_eq!(listed[1].weight, None);
    }

    #[test]
    fn test_duplicate_pairs_and_earliest_timestamp() {
        let (_dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();
        insert_score(&mut conn, &new_score("p1", 1, 900, 3)).unwrap();
        insert_score(&mut conn, &new_score("p1", 1, 910, 4)).unwrap();
        insert_score(&mut conn, &new_score("p1", 2, 800, 2)).unwrap();
        insert_score(&mut conn, &new_score("p2", 1, 700, 5)).unwrap();

        let pairs = list_duplicate_pairs(&mut conn, ("", i64::MIN), 10).unwrap();
        assert_eq!(
            pairs,
            vec![DuplicatePair { player_id: "p1".into(), leaderboard_id: 1, count: 2 }]
        );
        assert!(list_duplicate_pairs(&mut conn, ("p1", 1), 10).unwrap().is_empty());

        assert_eq!(earliest_timestamp(&mut conn, "p1").unwrap(), Some(at(2024, 5, 1, 2)));
        assert_eq!(earliest_timestamp(&mut conn, "nobody").unwrap(), None);
    }

    #[test]
    fn test_player_scores_join_leaderboards() {
        let (_dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();
        leaderboards::upsert_leaderboard(&mut conn, &leaderboard(1, 5.0, true)).unwrap();
        let mut unscored = new_score("p1", 1, 900, 1);
        unscored.accuracy = None;
        insert_score(&mut conn, &unscored).unwrap();

        let joined = list_player_scores(&mut conn, "p1").unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].leaderboard.stars, 5.0);

        let missing = list_ids_missing_accuracy(&mut conn, 0, 10).unwrap();
        assert_eq!(missing.len(), 1);
        let loaded = find_player_score(&mut conn, missing[0]).unwrap().unwrap();
        assert_eq!(loaded, joined[0]);
        assert_eq!(list_players_missing_weights(&mut conn, "", 10).unwrap(), vec!["p1"]);
    }
}

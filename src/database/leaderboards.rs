use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, params};

use super::connection::DbConn;
use crate::domain::{Leaderboard, LeaderboardId};

pub(super) const LEADERBOARD_COLUMNS: &str = "l.id, l.song_hash, l.song_name, l.difficulty, l.stars, l.max_score, l.ranked, l.qualified, l.seeded_scores, l.ranked_date";

/// Stores the upstream view of a leaderboard and returns the stars it had
/// before, if it was already known. The local `seeded_scores` flag is kept.
pub fn upsert_leaderboard(conn: &mut DbConn, leaderboard: &Leaderboard) -> Result<Option<f64>> {
    let previous_stars: Option<f64> = conn
        .query_row(
            "SELECT stars FROM leaderboards WHERE id = ?1",
            params![leaderboard.id],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to query leaderboard stars")?;

    let sql = "INSERT INTO leaderboards (id, song_hash, song_name, difficulty, stars, max_score, ranked, qualified, seeded_scores, ranked_date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
            song_hash = excluded.song_hash,
            song_name = excluded.song_name,
            difficulty = excluded.difficulty,
            stars = excluded.stars,
            max_score = excluded.max_score,
            ranked = excluded.ranked,
            qualified = excluded.qualified,
            ranked_date = excluded.ranked_date";

    conn.execute(
        sql,
        params![
            leaderboard.id,
            leaderboard.song_hash,
            leaderboard.song_name,
            leaderboard.difficulty,
            leaderboard.stars,
            leaderboard.max_score,
            leaderboard.ranked,
            leaderboard.qualified,
            leaderboard.seeded_scores,
            leaderboard.ranked_date,
        ],
    )
    .with_context(|| format!("Failed to upsert leaderboard {}", leaderboard.id))?;

    Ok(previous_stars)
}

pub fn find_by_id(conn: &mut DbConn, id: LeaderboardId) -> Result<Option<Leaderboard>> {
    let sql = format!("SELECT {} FROM leaderboards l WHERE l.id = ?1", LEADERBOARD_COLUMNS);

    conn.query_row(&sql, params![id], |row| parse_leaderboard_row(row, 0))
        .optional()
        .context("Failed to query leaderboard by id")
}

pub fn mark_seeded(conn: &mut DbConn, id: LeaderboardId) -> Result<()> {
    conn.execute(
        "UPDATE leaderboards SET seeded_scores = 1 WHERE id = ?1",
        params![id],
    )
    .with_context(|| format!("Failed to mark leaderboard {} as seeded", id))?;

    Ok(())
}

/// Ids of ranked, seeded leaderboards holding at least one score without a rank.
pub fn list_ids_missing_ranks(
    conn: &mut DbConn,
    after: LeaderboardId,
    limit: usize,
) -> Result<Vec<LeaderboardId>> {
    let sql = "SELECT l.id FROM leaderboards l
         WHERE l.ranked = 1 AND l.seeded_scores = 1 AND l.id > ?1
           AND EXISTS (SELECT 1 FROM scores s WHERE s.leaderboard_id = l.id AND s.rank IS NULL)
         ORDER BY l.id LIMIT ?2";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![after, limit as i64], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Maps the leaderboard columns starting at `offset`, so joined rows can reuse it.
pub(super) fn parse_leaderboard_row(
    row: &rusqlite::Row,
    offset: usize,
) -> rusqlite::Result<Leaderboard> {
    Ok(Leaderboard {
        id: row.get(offset)?,
        song_hash: row.get(offset + 1)?,
        song_name: row.get(offset + 2)?,
        difficulty: row.get(offset + 3)?,
        stars: row.get(offset + 4)?,
        max_score: row.get(offset + 5)?,
        ranked: row.get(offset + 6)?,
        qualified: row.get(offset + 7)?,
        seeded_scores: row.get(offset + 8)?,
        ranked_date: row.get(offset + 9)?,
    })
}

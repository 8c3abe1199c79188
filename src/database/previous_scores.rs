use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use super::connection::DbConn;
use super::scores::{SCORE_COLUMNS, SCORE_COLUMN_COUNT, parse_score_row};
use crate::domain::{PreviousScore, Score};

pub(super) fn insert_on(
    conn: &Connection,
    score: &Score,
    archived_at: DateTime<Utc>,
) -> rusqlite::Result<()> {
    let sql = "INSERT INTO previous_scores (score_id, player_id, leaderboard_id, base_score, modified_score, accuracy, pp, weight, rank, modifiers, misses, bad_cuts, max_combo, full_combo, timestamp, archived_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)";

    conn.execute(
        sql,
        params![
            score.score_id,
            score.player_id,
            score.leaderboard_id,
            score.base_score,
            score.modified_score,
            score.accuracy,
            score.pp,
            score.weight,
            score.rank,
            score.modifiers,
            score.misses,
            score.bad_cuts,
            score.max_combo,
            score.full_combo,
            score.timestamp,
            archived_at,
        ],
    )?;

    Ok(())
}

/// Every archived play of a player, oldest first.
pub fn list_by_player(conn: &mut DbConn, player_id: &str) -> Result<Vec<PreviousScore>> {
    let sql = format!(
        "SELECT {}, s.archived_at FROM previous_scores s WHERE s.player_id = ?1 ORDER BY s.timestamp, s.id",
        SCORE_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![player_id], |row| {
            Ok(PreviousScore {
                score: parse_score_row(row, 0)?,
                archived_at: row.get(SCORE_COLUMN_COUNT)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to list previous scores")?;

    Ok(rows)
}

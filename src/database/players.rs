use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use super::connection::DbConn;
use crate::domain::{Player, PlayerId};

const PLAYER_COLUMNS: &str = "id, name, country, pp, rank, country_rank, average_ranked_accuracy, total_score, total_ranked_score, total_play_count, ranked_play_count, inactive, banned, first_seen, joined_date, updated_at";

/// Inserts or refreshes a full profile. `first_seen` and `joined_date` keep
/// their stored value once set.
pub fn upsert_player(conn: &mut DbConn, player: &Player) -> Result<()> {
    let sql = "INSERT INTO players (id, name, country, pp, rank, country_rank, average_ranked_accuracy, total_score, total_ranked_score, total_play_count, ranked_play_count, inactive, banned, first_seen, joined_date, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            country = excluded.country,
            pp = excluded.pp,
            rank = excluded.rank,
            country_rank = excluded.country_rank,
            average_ranked_accuracy = excluded.average_ranked_accuracy,
            total_score = excluded.total_score,
            total_ranked_score = excluded.total_ranked_score,
            total_play_count = excluded.total_play_count,
            ranked_play_count = excluded.ranked_play_count,
            inactive = excluded.inactive,
            banned = excluded.banned,
            first_seen = COALESCE(players.first_seen, excluded.first_seen),
            joined_date = COALESCE(players.joined_date, excluded.joined_date),
            updated_at = excluded.updated_at";

    conn.execute(
        sql,
        params![
            player.id,
            player.name,
            player.country,
            player.pp,
            player.rank,
            player.country_rank,
            player.average_ranked_accuracy,
            player.total_score,
            player.total_ranked_score,
            player.total_play_count,
            player.ranked_play_count,
            player.inactive,
            player.banned,
            player.first_seen,
            player.joined_date,
            player.updated_at,
        ],
    )
    .with_context(|| format!("Failed to upsert player {}", player.id))?;

    Ok(())
}

/// Stores a player seen on a leaderboard page without touching an existing profile.
pub fn ensure_player(conn: &mut DbConn, player: &Player) -> Result<()> {
    let sql = "INSERT INTO players (id, name, country, first_seen) VALUES (?1, ?2, ?3, ?4) ON CONFLICT(id) DO NOTHING";

    conn.execute(
        sql,
        params![player.id, player.name, player.country, player.first_seen],
    )
    .with_context(|| format!("Failed to insert player {}", player.id))?;

    Ok(())
}

pub fn find_by_id(conn: &mut DbConn, id: &str) -> Result<Option<Player>> {
    let sql = format!("SELECT {} FROM players WHERE id = ?1", PLAYER_COLUMNS);

    conn.query_row(&sql, params![id], parse_player_row)
        .optional()
        .context("Failed to query player by id")
}

/// Keyset page of player ids, starting after `after`.
pub fn list_ids(conn: &mut DbConn, after: &str, limit: usize) -> Result<Vec<PlayerId>> {
    let sql = "SELECT id FROM players WHERE id > ?1 ORDER BY id LIMIT ?2";
    query_ids(conn, sql, after, limit).context("Failed to list player ids")
}

pub fn list_ids_missing_joined_date(
    conn: &mut DbConn,
    after: &str,
    limit: usize,
) -> Result<Vec<PlayerId>> {
    let sql = "SELECT id FROM players WHERE joined_date IS NULL AND id > ?1 ORDER BY id LIMIT ?2";
    query_ids(conn, sql, after, limit).context("Failed to list players without joined date")
}

fn query_ids(
    conn: &mut DbConn,
    sql: &str,
    after: &str,
    limit: usize,
) -> rusqlite::Result<Vec<PlayerId>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![after, limit as i64], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Sets the joined date only if it is still missing. Returns whether a row changed.
pub fn set_joined_date(conn: &mut DbConn, id: &str, joined: DateTime<Utc>) -> Result<bool> {
    let sql = "UPDATE players SET joined_date = ?1 WHERE id = ?2 AND joined_date IS NULL";

    let changed = conn
        .execute(sql, params![joined, id])
        .with_context(|| format!("Failed to set joined date for player {}", id))?;

    Ok(changed > 0)
}

pub fn count_players(conn: &mut DbConn) -> Result<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
        .context("Failed to count players")?;

    Ok(count as usize)
}

pub fn count_missing_joined_date(conn: &mut DbConn) -> Result<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM players WHERE joined_date IS NULL",
            [],
            |row| row.get(0),
        )
        .context("Failed to count players without joined date")?;

    Ok(count as usize)
}

fn parse_player_row(row: &rusqlite::Row) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        pp: row.get(3)?,
        rank: row.get(4)?,
        country_rank: row.get(5)?,
        average_ranked_accuracy: row.get(6)?,
        total_score: row.get(7)?,
        total_ranked_score: row.get(8)?,
        total_play_count: row.get(9)?,
        ranked_play_count: row.get(10)?,
        inactive: row.get(11)?,
        banned: row.get(12)?,
        first_seen: row.get(13)?,
        joined_date: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::get_connection;
    use crate::test_support::{at, player, temp_pool};

    #[test]
    fn test_upsert_keeps_first_seen() {
        let (_dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();

        let original = player("76561198000000001");
        upsert_player(&mut conn, &original).unwrap();

        let mut refreshed = original.clone();
        refreshed.pp = 5_000.0;
        refreshed.first_seen = Some(at(2024, 5, 2, 0));
        upsert_player(&mut conn, &refreshed).unwrap();

        let stored = find_by_id(&mut conn, &original.id).unwrap().unwrap();
        assert_eq!(stored.pp, 5_000.0);
        assert_eq!(stored.first_seen, original.first_seen);
    }

    #[test]
    fn test_ensure_player_does_not_overwrite_profile() {
        let (_dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();

        let full = player("p1");
        upsert_player(&mut conn, &full).unwrap();
        ensure_player(&mut conn, &Player::stub("p1", "Renamed", None)).unwrap();

        let stored = find_by_id(&mut conn, "p1").unwrap().unwrap();
        assert_eq!(stored.name, full.name);
        assert_eq!(stored.rank, full.rank);
    }

    #[test]
    fn test_keyset_pages_cover_every_player() {
        let (_dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();
        for id in ["a", "b", "c", "d", "e"] {
            upsert_player(&mut conn, &player(id)).unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor = String::new();
        loop {
            let page = list_ids(&mut conn, &cursor, 2).unwrap();
            let Some(last) = page.last() else { break };
            cursor = last.clone();
            seen.extend(page);
        }

        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(count_players(&mut conn).unwrap(), 5);
    }

    #[test]
    fn test_joined_date_is_set_once() {
        let (_dir, pool) = temp_pool();
        let mut conn = get_connection(&pool).unwrap();
        upsert_player(&mut conn, &player("p1")).unwrap();

        assert!(set_joined_date(&mut conn, "p1", at(2023, 1, 1, 0)).unwrap());
        assert!(!set_joined_date(&mut conn, "p1", at(2022, 1, 1, 0)).unwrap());

        let stored = find_by_id(&mut conn, "p1").unwrap().unwrap();
        assert_eq!(stored.joined_date, Some(at(2023, 1, 1, 0)));
        assert!(list_ids_missing_joined_date(&mut conn, "", 10).unwrap().is_empty());
    }
}

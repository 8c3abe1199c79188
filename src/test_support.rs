use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use crate::database::{self, DbPool};
use crate::domain::{Leaderboard, NewScore, Player, Score};

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn leaderboard(id: i64, stars: f64, ranked: bool) -> Leaderboard {
    Leaderboard {
        id,
        song_hash: format!("HASH{:04}", id),
        song_name: format!("Song {}", id),
        difficulty: 9,
        stars,
        max_score: 1000,
        ranked,
        qualified: false,
        seeded_scores: true,
        ranked_date: ranked.then(|| at(2024, 1, 1, 0)),
    }
}

pub fn score(id: i64, player: &str, leaderboard_id: i64, modified_score: i64) -> Score {
    Score {
        id,
        score_id: 10_000 + id,
        player_id: player.to_string(),
        leaderboard_id,
        base_score: modified_score,
        modified_score,
        accuracy: Some(modified_score as f64 / 10.0),
        pp: 0.0,
        weight: None,
        rank: None,
        modifiers: String::new(),
        misses: 0,
        bad_cuts: 0,
        max_combo: 500,
        full_combo: true,
        timestamp: at(2024, 5, 1, 12),
    }
}

/// Unsaved play; `hour` sets the timestamp on 2024-05-01 and keeps score ids distinct.
pub fn new_score(player: &str, leaderboard_id: i64, modified: i64, hour: u32) -> NewScore {
    NewScore {
        score_id: modified * 100 + hour as i64,
        player_id: player.to_string(),
        leaderboard_id,
        base_score: modified,
        modified_score: modified,
        accuracy: Some(modified as f64 / 10.0),
        pp: 0.0,
        modifiers: String::new(),
        misses: 0,
        bad_cuts: 0,
        max_combo: 300,
        full_combo: true,
        timestamp: at(2024, 5, 1, hour),
    }
}

pub fn player(id: &str) -> Player {
    Player {
        pp: 4_250.5,
        rank: Some(1_200),
        country_rank: Some(45),
        average_ranked_accuracy: Some(94.2),
        total_score: 12_000_000,
        total_ranked_score: 8_000_000,
        total_play_count: 320,
        ranked_play_count: 210,
        first_seen: Some(at(2023, 3, 14, 18)),
        updated_at: Some(at(2024, 5, 1, 0)),
        ..Player::stub(id, &format!("Player {}", id), Some("PL".to_string()))
    }
}

/// Pool over a fresh on-disk database with the schema applied.
pub fn temp_pool() -> (TempDir, DbPool) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stats.db");
    let pool = database::create_pool(path.to_str().unwrap()).unwrap();

    let mut conn = database::get_connection(&pool).unwrap();
    database::setup::initialize_schema(&mut conn).unwrap();
    drop(conn);

    (dir, pool)
}

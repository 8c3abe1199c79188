use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, info, warn};

use crate::api::tokens::{PlayerScoreToken, ScoreToken};
use crate::api::{ScoreSaberClient, parsers};
use crate::config::AppConfig;
use crate::database::{self, DbConn, DbPool, leaderboards, players, scores};
use crate::domain::{BatchReport, Leaderboard, LeaderboardId, NewScore, PlayerId};
use crate::errors::{StatsError, StatsResult};
use crate::services::ranking::RankingService;

/// What happened to one upstream score
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreOutcome {
    Inserted,
    Replaced,
    Unchanged,
}

/// Summary of one ingestion run
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub scores: BatchReport,
    /// Re-weight, re-rank and reprocess work done after storing, one record per task
    pub follow_up: BatchReport,
    pub players_reweighted: usize,
    pub leaderboards_reranked: usize,
    pub leaderboards_reprocessed: usize,
}

// Leaderboards and players touched while storing a batch of scores.
#[derive(Default)]
struct Touched {
    leaderboards: BTreeMap<LeaderboardId, Leaderboard>,
    star_changes: BTreeSet<LeaderboardId>,
    players: BTreeSet<PlayerId>,
}

pub struct IngestionService {
    pool: DbPool,
    client: ScoreSaberClient,
    ranking: RankingService,
}

impl IngestionService {
    pub fn new(config: &AppConfig, pool: DbPool) -> Result<Self> {
        Ok(Self {
            client: ScoreSaberClient::new(&config.scoresaber)?,
            ranking: RankingService::new(pool.clone()),
            pool,
        })
    }

    /// Fetches a player's profile and every score, stores them, then brings
    /// weights, ranks and pp up to date.
    pub async fn ingest_player(&mut self, player_id: &str) -> StatsResult<IngestSummary> {
        info!("=== Ingesting player {} ===", player_id);

        let token = self
            .client
            .fetch_player(player_id)
            .await?
            .ok_or_else(|| StatsError::not_found("player", player_id))?;
        let now = Utc::now();
        let player = parsers::parse_player(&token, now)?;

        let score_tokens = self.client.fetch_player_scores(&player.id).await?;
        info!("  → Fetched profile and {} scores", score_tokens.len());

        let mut summary = IngestSummary::default();
        let mut touched = Touched::default();
        {
            let mut conn = database::get_connection(&self.pool)?;
            players::upsert_player(&mut conn, &player)?;

            for token in &score_tokens {
                let key = format!("score {}", token.score.id);
                match store_player_score(&mut conn, &player.id, token, now, &mut touched) {
                    Ok(outcome) => record_outcome(&mut summary.scores, outcome),
                    Err(e) => {
                        warn!("Skipping {}: {:#}", key, e);
                        summary.scores.record_failure(&key, e);
                    }
                }
            }
        }
        touched.players.insert(player.id.clone());

        self.finish(touched, &mut summary);
        log_summary(&summary);
        Ok(summary)
    }

    /// Fetches every score of a leaderboard, stores them and marks the
    /// leaderboard as seeded so that its ranks can be maintained.
    pub async fn seed_leaderboard(
        &mut self,
        leaderboard_id: LeaderboardId,
    ) -> StatsResult<IngestSummary> {
        info!("=== Seeding leaderboard {} ===", leaderboard_id);

        let token = self
            .client
            .fetch_leaderboard(leaderboard_id)
            .await?
            .ok_or_else(|| StatsError::not_found("leaderboard", leaderboard_id))?;
        let leaderboard = parsers::parse_leaderboard(&token)?;
        let score_tokens = self.client.fetch_leaderboard_scores(leaderboard_id).await?;
        let now = Utc::now();

        let mut summary = IngestSummary::default();
        let mut touched = Touched::default();
        {
            let mut conn = database::get_connection(&self.pool)?;
            register_leaderboard(&mut conn, &leaderboard, &mut touched)?;

            for token in &score_tokens {
                let key = format!("score {}", token.id);
                match store_leaderboard_score(&mut conn, &leaderboard, token, now, &mut touched) {
                    Ok(outcome) => record_outcome(&mut summary.scores, outcome),
                    Err(e) => {
                        warn!("Skipping {}: {:#}", key, e);
                        summary.scores.record_failure(&key, e);
                    }
                }
            }

            leaderboards::mark_seeded(&mut conn, leaderboard_id)?;
        }

        self.finish(touched, &mut summary);
        log_summary(&summary);
        Ok(summary)
    }

    // Reprocess star changes, re-weight players, then re-rank leaderboards.
    fn finish(&self, touched: Touched, summary: &mut IngestSummary) {
        for &leaderboard_id in &touched.star_changes {
            match self.ranking.reprocess_leaderboard_pp(leaderboard_id) {
                Ok(players) => {
                    summary.leaderboards_reprocessed += 1;
                    summary.follow_up.record_updated();
                    summary.follow_up.merge(players);
                }
                Err(e) => {
                    error!("Failed to reprocess leaderboard {}: {:#}", leaderboard_id, e);
                    summary
                        .follow_up
                        .record_failure(&format!("reprocess leaderboard {}", leaderboard_id), e);
                }
            }
        }

        let player_ids: Vec<PlayerId> = touched.players.into_iter().collect();
        let report = self.ranking.recompute_players(&player_ids);
        summary.players_reweighted += report.updated;
        summary.follow_up.merge(report);

        for (leaderboard_id, leaderboard) in &touched.leaderboards {
            if !leaderboard.ranked {
                continue;
            }
            match self.ranking.refresh_leaderboard_scores_rank(*leaderboard_id) {
                Ok(refresh) if refresh.scores_count > 0 => {
                    summary.leaderboards_reranked += 1;
                    summary.follow_up.record_updated();
                }
                Ok(_) => summary.follow_up.record_skipped(),
                Err(e) => {
                    error!("Failed to rank leaderboard {}: {:#}", leaderboard_id, e);
                    summary
                        .follow_up
                        .record_failure(&format!("rank leaderboard {}", leaderboard_id), e);
                }
            }
        }
    }
}

fn store_player_score(
    conn: &mut DbConn,
    player_id: &str,
    token: &PlayerScoreToken,
    now: DateTime<Utc>,
    touched: &mut Touched,
) -> StatsResult<ScoreOutcome> {
    let leaderboard = parsers::parse_leaderboard(&token.leaderboard)?;
    let score = parsers::parse_score(&token.score, player_id, &leaderboard)?;

    register_leaderboard(conn, &leaderboard, touched)?;
    let outcome = store_score(conn, &score, now)?;
    Ok(outcome)
}

fn store_leaderboard_score(
    conn: &mut DbConn,
    leaderboard: &Leaderboard,
    token: &ScoreToken,
    now: DateTime<Utc>,
    touched: &mut Touched,
) -> StatsResult<ScoreOutcome> {
    let info = token.leaderboard_player_info.as_ref().ok_or_else(|| {
        StatsError::InvalidToken(format!("score {} has no player info", token.id))
    })?;
    let player = parsers::parse_leaderboard_player(info)?;
    let score = parsers::parse_score(token, &player.id, leaderboard)?;

    players::ensure_player(conn, &player)?;
    let outcome = store_score(conn, &score, now)?;
    if outcome != ScoreOutcome::Unchanged {
        touched.players.insert(player.id);
    }
    Ok(outcome)
}

// Upserts a leaderboard once per run and notes whether its stars moved.
fn register_leaderboard(
    conn: &mut DbConn,
    leaderboard: &Leaderboard,
    touched: &mut Touched,
) -> Result<()> {
    if touched.leaderboards.contains_key(&leaderboard.id) {
        return Ok(());
    }

    let previous_stars = leaderboards::upsert_leaderboard(conn, leaderboard)?;
    if previous_stars.is_some_and(|stars| stars_changed(stars, leaderboard.stars)) {
        info!(
            "  → Leaderboard {} stars changed to {:.2}",
            leaderboard.id, leaderboard.stars
        );
        touched.star_changes.insert(leaderboard.id);
    }
    touched.leaderboards.insert(leaderboard.id, leaderboard.clone());
    Ok(())
}

/// New pair inserts; the same upstream play is skipped; a newer play archives
/// the stored one and takes its place.
pub fn store_score(conn: &mut DbConn, score: &NewScore, now: DateTime<Utc>) -> Result<ScoreOutcome> {
    let Some(current) = scores::find_latest_for_pair(conn, &score.player_id, score.leaderboard_id)?
    else {
        scores::insert_score(conn, score)?;
        return Ok(ScoreOutcome::Inserted);
    };

    if current.score_id == score.score_id || score.timestamp <= current.timestamp {
        return Ok(ScoreOutcome::Unchanged);
    }

    scores::archive_and_replace(conn, &current, score, now)?;
    Ok(ScoreOutcome::Replaced)
}

fn stars_changed(before: f64, after: f64) -> bool {
    (before - after).abs() > 1e-6
}

fn record_outcome(report: &mut BatchReport, outcome: ScoreOutcome) {
    match outcome {
        ScoreOutcome::Inserted | ScoreOutcome::Replaced => report.record_updated(),
        ScoreOutcome::Unchanged => report.record_skipped(),
    }
}

fn log_summary(summary: &IngestSummary) {
    info!(
        "=== Ingestion complete: {} stored, {} unchanged, {} rejected; {} players re-weighted, {} leaderboards ranked, {} reprocessed, {} follow-up failures ===",
        summary.scores.updated,
        summary.scores.skipped,
        summary.scores.failed,
        summary.players_reweighted,
        summary.leaderboards_reranked,
        summary.leaderboards_reprocessed,
        summary.follow_up.failed
    );
}

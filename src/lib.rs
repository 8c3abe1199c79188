pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod domain;
pub mod errors;
pub mod http;
pub mod pagination;
pub mod rate_limiter;
pub mod rating;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use log::info;

use crate::cli::{Cli, Command, Migration};
use crate::config::AppConfig;
use crate::database::DbPool;
use crate::domain::{BatchReport, DailyHistory};
use crate::services::{
    BoundaryService, HistoryService, IngestSummary, IngestionService, MigrationService,
    RankingService,
};

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

pub fn handle_init_db(reset: bool) -> Result<()> {
    let config = AppConfig::from_env();
    let pool = database::create_pool(&config.database_path)?;
    let mut conn = database::get_connection(&pool)?;

    if reset {
        database::setup::reset_database(&mut conn)?;
    } else {
        database::setup::initialize_schema(&mut conn)?;
    }

    println!("{} {}", "Database ready:".green().bold(), config.database_path);
    Ok(())
}

pub fn handle_ingest(player_id: &str) -> Result<()> {
    let config = AppConfig::from_env();
    let pool = open_pool(&config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut service = IngestionService::new(&config, pool)?;
        let summary = service.ingest_player(player_id).await?;
        print_ingest_summary(&summary);
        Ok(())
    })
}

pub fn handle_seed(leaderboard_id: i64) -> Result<()> {
    let config = AppConfig::from_env();
    let pool = open_pool(&config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut service = IngestionService::new(&config, pool)?;
        let summary = service.seed_leaderboard(leaderboard_id).await?;
        print_ingest_summary(&summary);
        Ok(())
    })
}

pub fn handle_rank(leaderboard_id: i64) -> Result<()> {
    let config = AppConfig::from_env();
    let service = RankingService::new(open_pool(&config)?);

    let refresh = service.refresh_leaderboard_scores_rank(leaderboard_id)?;
    println!(
        "{} {} scores on leaderboard {} in {:?}",
        "Ranked".green().bold(),
        refresh.scores_count,
        leaderboard_id,
        refresh.time_taken
    );
    Ok(())
}

pub fn handle_weights(player_id: &str) -> Result<()> {
    let config = AppConfig::from_env();
    let service = RankingService::new(open_pool(&config)?);

    let weighted = service.recompute_player_weights(player_id)?;
    println!(
        "{} {} ranked scores, {} weighted pp",
        "Weighted".green().bold(),
        weighted.len(),
        format!("{:.2}", weighted.total_pp).cyan()
    );
    Ok(())
}

pub fn handle_reprocess(leaderboard_id: i64) -> Result<()> {
    let config = AppConfig::from_env();
    let service = RankingService::new(open_pool(&config)?);

    let report = service.reprocess_leaderboard_pp(leaderboard_id)?;
    print_batch_report(&format!("reprocess {}", leaderboard_id), &report);
    Ok(())
}

pub fn handle_pp(stars: f64, accuracy: f64) -> Result<()> {
    let pp = rating::get_pp(stars, accuracy);
    println!(
        "{:.2}★ at {:.2}% → {}",
        stars,
        accuracy,
        format!("{:.2}pp", pp).cyan().bold()
    );
    Ok(())
}

pub fn handle_accuracy(stars: f64, pp: f64) -> Result<()> {
    match rating::accuracy_for_pp(stars, pp) {
        Some(accuracy) => println!(
            "{:.2}pp on {:.2}★ needs {}",
            pp,
            stars,
            format!("{:.3}%", accuracy).cyan().bold()
        ),
        None => println!(
            "{} {:.2}pp is out of reach on {:.2}★ (max {:.2}pp)",
            "Unreachable:".yellow().bold(),
            pp,
            stars,
            rating::max_pp(stars)
        ),
    }
    Ok(())
}

pub fn handle_boundary(player_id: &str, count: Option<usize>) -> Result<()> {
    let config = AppConfig::from_env();
    let service = BoundaryService::new(open_pool(&config)?, config.boundary.clone());

    let boundaries = service.get_player_pp_boundary(player_id, count)?;
    if boundaries.is_empty() {
        println!("{} player has no ranked scores", "No boundary:".yellow().bold());
        return Ok(());
    }

    for (index, raw_pp) in boundaries.iter().enumerate() {
        println!("{:>4} → {}", format!("+{}", index + 1).bold(), format!("{:.2}pp", raw_pp).cyan());
    }
    Ok(())
}

pub fn handle_history(player_id: Option<&str>, date: Option<NaiveDate>) -> Result<()> {
    let config = AppConfig::from_env();
    let service = HistoryService::new(open_pool(&config)?, config.batch.clone());
    let date = date.unwrap_or_else(|| Utc::now().date_naive());

    match player_id {
        Some(player_id) => {
            let daily = service.build_daily_history_entry(player_id, date)?;
            print_history(&daily)?;
        }
        None => {
            let report = service.run_daily(date)?;
            print_batch_report(&format!("history {}", date), &report);
        }
    }
    Ok(())
}

pub fn handle_migrate(migration: Migration) -> Result<()> {
    let config = AppConfig::from_env();
    let service = MigrationService::new(open_pool(&config)?, config.batch.clone());

    let report = match migration {
        Migration::JoinedDates => service.backfill_joined_dates()?,
        Migration::SplitScores => service.split_duplicate_scores()?,
        Migration::RankFields => service.backfill_rank_fields()?,
        Migration::Accuracy => service.backfill_accuracy()?,
        Migration::All => service.run_all()?,
    };
    print_batch_report(&format!("{:?}", migration), &report);
    Ok(())
}

pub fn handle_completions(shell: Shell) -> Result<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}

fn open_pool(config: &AppConfig) -> Result<DbPool> {
    info!("Using database {}", config.database_path);
    let pool = database::create_pool(&config.database_path)?;
    let mut conn = database::get_connection(&pool)?;
    database::setup::initialize_schema(&mut conn)?;
    Ok(pool)
}

fn print_ingest_summary(summary: &IngestSummary) {
    print_batch_report("scores", &summary.scores);
    print_batch_report("follow-up", &summary.follow_up);
    println!(
        "  players re-weighted: {}, leaderboards ranked: {}, reprocessed: {}",
        summary.players_reweighted, summary.leaderboards_reranked, summary.leaderboards_reprocessed
    );
}

fn print_batch_report(job: &str, report: &BatchReport) {
    let status = if report.failed == 0 {
        "Done".green().bold()
    } else {
        "Done with failures".yellow().bold()
    };
    println!(
        "{} {}: {} processed, {} updated, {} skipped, {} failed",
        status, job, report.processed, report.updated, report.skipped, report.failed
    );
    for error in &report.errors {
        println!("  {} {}", "✗".red(), error);
    }
}

fn print_history(daily: &DailyHistory) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&daily.entry)?);
    match &daily.change {
        Some(change) => println!(
            "{} rank {:+}, pp {:+.2}",
            "Since yesterday:".bold(),
            change.rank.unwrap_or(0),
            change.pp
        ),
        None => println!("{}", "No entry for the previous day".dimmed()),
    }
    Ok(())
}

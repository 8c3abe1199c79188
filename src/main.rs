use anyhow::Result;

use scoresaber_stats::cli::Command;
use scoresaber_stats::{
    handle_accuracy, handle_boundary, handle_completions, handle_history, handle_ingest,
    handle_init_db, handle_migrate, handle_pp, handle_rank, handle_reprocess, handle_seed,
    handle_weights, interpret,
};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let command = interpret();
    execute_command(&command)
}

fn execute_command(command: &Command) -> Result<()> {
    match command {
        Command::InitDb { reset } => handle_init_db(*reset),
        Command::Ingest { player } => handle_ingest(player),
        Command::Seed { leaderboard } => handle_seed(*leaderboard),
        Command::Rank { leaderboard } => handle_rank(*leaderboard),
        Command::Weights { player } => handle_weights(player),
        Command::Reprocess { leaderboard } => handle_reprocess(*leaderboard),
        Command::Pp { stars, accuracy } => handle_pp(*stars, *accuracy),
        Command::Accuracy { stars, pp } => handle_accuracy(*stars, *pp),
        Command::Boundary { player, count } => handle_boundary(player, *count),
        Command::History { player, date } => handle_history(player.as_deref(), *date),
        Command::Migrate { migration } => handle_migrate(*migration),
        Command::Completions { shell } => handle_completions(*shell),
    }
}

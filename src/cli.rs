use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "ScoreSaber player statistics: pp, ranks, weights and daily history")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Create the database schema
    InitDb {
        /// Drop every table before creating the schema
        #[arg(long)]
        reset: bool,
    },
    /// Fetch a player's profile and scores from ScoreSaber and store them
    Ingest {
        #[arg(short, long)]
        player: String,
    },
    /// Fetch every score of a leaderboard, store them and enable rank upkeep
    Seed {
        #[arg(short, long)]
        leaderboard: i64,
    },
    /// Recompute the ranks of a leaderboard's scores
    Rank {
        #[arg(short, long)]
        leaderboard: i64,
    },
    /// Recompute a player's score weights and weighted pp
    Weights {
        #[arg(short, long)]
        player: String,
    },
    /// Recompute pp of a leaderboard's scores after a star change
    Reprocess {
        #[arg(short, long)]
        leaderboard: i64,
    },
    /// PP for a star rating and accuracy
    Pp {
        #[arg(short, long)]
        stars: f64,
        /// Accuracy in percent (0-100)
        #[arg(short, long)]
        accuracy: f64,
    },
    /// Accuracy needed for a pp value on a star rating
    Accuracy {
        #[arg(short, long)]
        stars: f64,
        #[arg(short, long)]
        pp: f64,
    },
    /// Raw pp a new score needs for +1 .. +N weighted pp
    Boundary {
        #[arg(short, long)]
        player: String,
        /// Number of boundaries (defaults to 25)
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Build the daily history entry of one player, or of every player
    History {
        #[arg(short, long)]
        player: Option<String>,
        /// UTC date, YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<chrono::NaiveDate>,
    },
    /// Run a backfill over stored data
    Migrate {
        #[arg(value_enum)]
        migration: Migration,
    },
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum Migration {
    JoinedDates,
    SplitScores,
    RankFields,
    Accuracy,
    All,
}

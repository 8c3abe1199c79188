pub mod boundary;
pub mod history;
pub mod ingestion;
pub mod migration;
pub mod ranking;

pub use boundary::BoundaryService;
pub use history::HistoryService;
pub use ingestion::{IngestSummary, IngestionService};
pub use migration::MigrationService;
pub use ranking::RankingService;

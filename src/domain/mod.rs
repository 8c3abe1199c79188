pub mod history;
pub mod models;
mod progress;

pub use history::{HistoryInput, build_history_entry};
pub use models::*;
pub use progress::{BatchProgress, BatchReport};

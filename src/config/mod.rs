pub mod settings;

pub use settings::{AppConfig, BatchSettings, BoundarySettings, ScoreSaberSettings};

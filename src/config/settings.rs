use std::env;

#[derive(Debug, Clone)]
pub struct ScoreSaberSettings {
    pub base_url: String,
    pub user_agent: &'static str,
    pub timeout_secs: u64,
    pub max_requests: usize,
    pub window_secs: u64,
    pub page_size: usize,
    pub max_pages: Option<usize>,
}

impl Default for ScoreSaberSettings {
    fn default() -> Self {
        Self {
            base_url: "https://scoresaber.com/api".to_string(),
            user_agent: "ScoreSaberStats/1.0",
            timeout_secs: 30,
            max_requests: 400, // upstream allows 400 req/min
            window_secs: 60,
            page_size: 100,
            max_pages: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub progress_every: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 500,
            progress_every: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoundarySettings {
    pub default_count: usize,
}

impl Default for BoundarySettings {
    fn default() -> Self {
        Self { default_count: 25 }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub scoresaber: ScoreSaberSettings,
    pub batch: BatchSettings,
    pub boundary: BoundarySettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            database_path: "scoresaber_stats.db".to_string(),
            scoresaber: ScoreSaberSettings::default(),
            batch: BatchSettings::default(),
            boundary: BoundarySettings::default(),
        }
    }

    /// Defaults overridden by `DATABASE_PATH`, `SCORESABER_API_URL` and `BATCH_SIZE`.
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(path) = env::var("DATABASE_PATH") {
            config.database_path = path;
        }
        if let Ok(url) = env::var("SCORESABER_API_URL") {
            config.scoresaber.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(size) = env::var("BATCH_SIZE").ok().and_then(|s| s.parse().ok()) {
            config.batch.batch_size = clamp_batch_size(size);
        }

        config
    }
}

fn clamp_batch_size(size: usize) -> usize {
    size.clamp(1, 10_000)
}

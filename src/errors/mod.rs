use thiserror::Error;

/// Errors surfaced by store-backed operations.
///
/// Pure computations (curve, weighting, boundary search) never produce these;
/// they clamp their input instead.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid upstream data: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type StatsResult<T> = std::result::Result<T, StatsError>;

impl StatsError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StatsError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StatsError::NotFound { .. })
    }

    /// HTTP status an outer layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            StatsError::NotFound { .. } => 404,
            StatsError::InvalidState(_) | StatsError::InvalidToken(_) => 400,
            StatsError::Store(_) => 500,
        }
    }
}

/// Add context to fetch errors
pub fn fetch_context(url: &str) -> String {
    format!("Failed to fetch from: {}", url)
}

/// Add context to parse errors
pub fn parse_context(data_type: &str) -> String {
    format!("Failed to parse {}", data_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StatsError::not_found("player", "76561198").status_code(), 404);
        assert_eq!(StatsError::InvalidState("unranked".into()).status_code(), 400);
        assert_eq!(StatsError::InvalidToken("bad".into()).status_code(), 400);
        assert_eq!(StatsError::from(anyhow::anyhow!("disk")).status_code(), 500);
    }

    #[test]
    fn test_not_found_message() {
        let err = StatsError::not_found("leaderboard", 42);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "leaderboard 42 not found");
    }
}

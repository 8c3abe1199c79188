use crate::api::parsers;
use crate::api::tokens::{
    LeaderboardToken, PlayerScoreCollectionToken, PlayerScoreToken, PlayerToken,
    ScoreCollectionToken, ScoreToken,
};
use crate::config::ScoreSaberSettings;
use crate::domain::LeaderboardId;
use crate::http::RateLimitedClient;
use crate::pagination::{PageIterator, PaginationConfig, with_page_param};
use anyhow::Result;
use log::{debug, info};

/// ScoreSaber API client
pub struct ScoreSaberClient {
    client: RateLimitedClient,
    base_url: String,
    page_size: usize,
    pagination: PaginationConfig,
}

impl ScoreSaberClient {
    pub fn new(settings: &ScoreSaberSettings) -> Result<Self> {
        let client = RateLimitedClient::new(
            settings.user_agent,
            settings.timeout_secs,
            settings.max_requests,
            settings.window_secs,
        )?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            page_size: settings.page_size,
            pagination: PaginationConfig::from_limit(settings.max_pages),
        })
    }

    /// Fetch a player's full profile; `None` when the player does not exist
    pub async fn fetch_player(&mut self, player_id: &str) -> Result<Option<PlayerToken>> {
        let url = Self::build_player_url(&self.base_url, player_id);
        self.client.get_json(&url, "player profile").await
    }

    /// Fetch every score page of a player, most recent first
    pub async fn fetch_player_scores(&mut self, player_id: &str) -> Result<Vec<PlayerScoreToken>> {
        info!("Fetching scores for player {}", player_id);

        let mut pages = PageIterator::new(self.pagination.clone());
        let mut scores = Vec::new();

        while !pages.has_reached_max() {
            let url = Self::build_player_scores_url(
                &self.base_url,
                player_id,
                self.page_size,
                pages.current_page(),
            );
            let Some(page) = self
                .client
                .get_json::<PlayerScoreCollectionToken>(&url, "player scores")
                .await?
            else {
                break;
            };

            debug!(
                "  → page {}: {} scores",
                pages.current_page(),
                page.player_scores.len()
            );
            let has_more = parsers::has_more_pages(&page.metadata) && !page.player_scores.is_empty();
            scores.extend(page.player_scores);

            if !has_more {
                break;
            }
            pages.advance();
        }

        info!("Fetched {} scores for player {}", scores.len(), player_id);
        Ok(scores)
    }

    /// Fetch leaderboard info; `None` when the leaderboard does not exist
    pub async fn fetch_leaderboard(
        &mut self,
        leaderboard_id: LeaderboardId,
    ) -> Result<Option<LeaderboardToken>> {
        let url = Self::build_leaderboard_url(&self.base_url, leaderboard_id);
        self.client.get_json(&url, "leaderboard info").await
    }

    /// Fetch every score page of a leaderboard
    pub async fn fetch_leaderboard_scores(
        &mut self,
        leaderboard_id: LeaderboardId,
    ) -> Result<Vec<ScoreToken>> {
        info!("Fetching scores for leaderboard {}", leaderboard_id);

        let mut pages = PageIterator::new(self.pagination.clone());
        let mut scores = Vec::new();

        while !pages.has_reached_max() {
            let url = Self::build_leaderboard_scores_url(
                &self.base_url,
                leaderboard_id,
                pages.current_page(),
            );
            let Some(page) = self
                .client
                .get_json::<ScoreCollectionToken>(&url, "leaderboard scores")
                .await?
            else {
                break;
            };

            let has_more = parsers::has_more_pages(&page.metadata) && !page.scores.is_empty();
            scores.extend(page.scores);

            if !has_more {
                break;
            }
            pages.advance();
        }

        info!(
            "Fetched {} scores for leaderboard {}",
            scores.len(),
            leaderboard_id
        );
        Ok(scores)
    }

    // --- Helper Methods ---

    fn build_player_url(base_url: &str, player_id: &str) -> String {
        format!("{}/player/{}/full", base_url, player_id)
    }

    fn build_player_scores_url(
        base_url: &str,
        player_id: &str,
        limit: usize,
        page: usize,
    ) -> String {
        let base = format!("{}/player/{}/scores?sort=recent&limit={}", base_url, player_id, limit);
        with_page_param(&base, page)
    }

    fn build_leaderboard_url(base_url: &str, leaderboard_id: LeaderboardId) -> String {
        format!("{}/leaderboard/by-id/{}/info", base_url, leaderboard_id)
    }

    fn build_leaderboard_scores_url(
        base_url: &str,
        leaderboard_id: LeaderboardId,
        page: usize,
    ) -> String {
        let base = format!("{}/leaderboard/by-id/{}/scores", base_url, leaderboard_id);
        with_page_param(&base, page)
    }
}

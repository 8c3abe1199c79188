use crate::errors::{fetch_context, parse_context};
use crate::rate_limiter::RateLimiter;
use anyhow::{Context, Result, bail};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client with built-in rate limiting
pub struct RateLimitedClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl RateLimitedClient {
    pub fn new(
        user_agent: &str,
        timeout_secs: u64,
        max_requests: usize,
        window_secs: u64,
    ) -> Result<Self> {
        let client = Self::build_client(user_agent, timeout_secs)?;
        let rate_limiter = RateLimiter::new(max_requests, Duration::from_secs(window_secs));

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    pub async fn get(&mut self, url: &str) -> Result<reqwest::Response> {
        self.rate_limiter.wait().await;
        self.send_get_request(url).await
    }

    /// GET and decode a JSON body. A 404 means the resource does not exist and
    /// yields `None`; any other non-success status is an error.
    pub async fn get_json<T: DeserializeOwned>(
        &mut self,
        url: &str,
        data_type: &str,
    ) -> Result<Option<T>> {
        let response = self.get(url).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            bail!("{}: upstream returned {}", fetch_context(url), status);
        }

        let body = response
            .json::<T>()
            .await
            .with_context(|| parse_context(data_type))?;
        Ok(Some(body))
    }

    fn build_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
        Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")
    }

    async fn send_get_request(&self, url: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| fetch_context(url))
    }
}

use crate::config::Config;
use crate::odds_api::{H2H_MARKET, SPREADS_MARKET};
use anyhow::{anyhow, Context, Result};
use governor::{Quota, RateLimiter};
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{info, warn};

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP client with timeouts
fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to create HTTP client")
}

/// Download a text document such as a season CSV.
pub async fn download_text(url: &str) -> Result<String> {
    let response = http_client()?
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("Download of {} failed (status {})", url, status));
    }
    let bytes = response
        .bytes()
        .await
        .context("Failed to read response body")?;
    info!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Thin client over The Odds API v4.
///
/// Payloads come back as raw JSON; the loaders validate record shapes so a
/// stored snapshot and a fresh response go through the same checks.
pub struct OddsApiClient {
    http_client: reqwest::Client,
    rate_limiter: DirectLimiter,
    api_key: String,
    base_url: String,
    sport_key: String,
}

impl OddsApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .odds_api_key
            .clone()
            .ok_or_else(|| anyhow!("ODDS_API_KEY is required to fetch from The Odds API"))?;

        let per_minute = NonZeroU32::new(config.requests_per_minute)
            .ok_or_else(|| anyhow!("REQUESTS_PER_MINUTE must be positive"))?;
        let rate_limiter = RateLimiter::direct(Quota::per_minute(per_minute));

        Ok(Self {
            http_client: http_client()?,
            rate_limiter,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            sport_key: config.sport_key.clone(),
        })
    }

    /// Current handicap lines, as stored in `spreads_*.json`.
    pub async fn fetch_spreads(&self, regions: &str, bookmakers: &str) -> Result<Value> {
        let url = format!("{}/sports/{}/odds", self.base_url, self.sport_key);
        let payload = self
            .get_json(
                &url,
                &[
                    ("regions", regions),
                    ("markets", SPREADS_MARKET),
                    ("bookmakers", bookmakers),
                ],
            )
            .await
            .context("Failed to fetch spreads")?;

        info!("Fetched {} events with spreads", list_len(&payload));
        Ok(payload)
    }

    /// Scores for games from the last `days_from` days, completed or not.
    pub async fn fetch_scores(&self, days_from: u32) -> Result<Value> {
        let url = format!("{}/sports/{}/scores", self.base_url, self.sport_key);
        let days_from = days_from.to_string();
        let payload = self
            .get_json(&url, &[("daysFrom", days_from.as_str())])
            .await
            .context("Failed to fetch scores")?;

        info!(
            "Fetched {} score records (daysFrom={})",
            list_len(&payload),
            days_from
        );
        Ok(payload)
    }

    pub async fn fetch_h2h(&self, regions: &str, bookmakers: Option<&str>) -> Result<Value> {
        let url = format!("{}/sports/{}/odds", self.base_url, self.sport_key);
        let mut query = vec![("regions", regions), ("markets", H2H_MARKET)];
        if let Some(bookmakers) = bookmakers {
            query.push(("bookmakers", bookmakers));
        }
        let payload = self
            .get_json(&url, &query)
            .await
            .context("Failed to fetch h2h odds")?;

        info!("Fetched {} events with h2h odds", list_len(&payload));
        Ok(payload)
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        // Wait for rate limit
        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .get(url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        // Log API usage from headers
        if let Some(remaining) = response.headers().get("x-requests-remaining") {
            info!(
                "API requests remaining: {}",
                remaining.to_str().unwrap_or("?")
            );
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            return Err(anyhow!("Odds API error (status {}): {}", status, body));
        }

        let payload: Value = serde_json::from_str(&body).context("Failed to parse response")?;
        if !payload.is_array() {
            warn!("Odds API returned a non-list payload from {}", url);
        }
        Ok(payload)
    }
}

fn list_len(payload: &Value) -> usize {
    payload.as_array().map(Vec::len).unwrap_or(0)
}

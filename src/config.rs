use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;

/// Configuration
#[derive(Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Absent means no fetching; the run analyzes stored snapshots only.
    pub odds_api_key: Option<String>,
    pub api_base_url: String,
    pub sport_key: String,
    pub spread_regions: String,
    pub spread_bookmakers: String,
    pub h2h_regions: String,
    pub h2h_bookmakers: Option<String>,
    pub scores_days_from: u32,
    pub requests_per_minute: u32,
    /// If false, skip the fetch step even when a key is configured
    pub run_fetch: bool,
    /// football-data.co.uk season CSV, as a file path or http(s) URL
    pub backfill_csv: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str, default: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let odds_api_key = match lookup("ODDS_API_KEY").map(|v| v.trim().to_string()) {
            Some(key) if key.is_empty() => {
                return Err(anyhow!("ODDS_API_KEY is set but empty"))
            }
            Some(key) => Some(check_not_placeholder(key)?),
            None => None,
        };

        let h2h_bookmakers = Some(var("H2H_BOOKMAKERS", "draftkings")).filter(|v| v != "all");

        let run_fetch = match lookup("RUN_FETCH") {
            Some(v) => v.trim().eq_ignore_ascii_case("true"),
            None => odds_api_key.is_some(),
        };

        Ok(Self {
            data_dir: PathBuf::from(var("DATA_DIR", "data")),
            output_dir: PathBuf::from(var("OUTPUT_DIR", "docs/data/aggregated")),
            odds_api_key,
            api_base_url: var("ODDS_API_BASE_URL", "https://api.the-odds-api.com/v4"),
            sport_key: var("SPORT_KEY", "soccer_epl"),
            spread_regions: var("ODDS_REGIONS", "uk"),
            spread_bookmakers: var("SPREAD_BOOKMAKERS", "bet365"),
            h2h_regions: var("H2H_REGIONS", "uk,eu,us"),
            h2h_bookmakers,
            scores_days_from: var("SCORES_DAYS_FROM", "3").parse().unwrap_or(3),
            requests_per_minute: var("REQUESTS_PER_MINUTE", "30")
                .parse()
                .unwrap_or(30)
                .max(1),
            run_fetch,
            backfill_csv: Some(var("BACKFILL_CSV", "")).filter(|v| !v.is_empty()),
        })
    }
}

/// Prevent accidental use of sample/placeholder keys
fn check_not_placeholder(key: String) -> Result<String> {
    let key_lower = key.to_lowercase();
    if key_lower.contains("change_me")
        || key_lower.contains("your_")
        || key_lower.starts_with("sample")
    {
        return Err(anyhow!(
            "ODDS_API_KEY appears to be a placeholder value; replace with your real key"
        ));
    }
    Ok(key)
}

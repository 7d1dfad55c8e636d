use anyhow::{Context, Result};
use chrono::Utc;
use epl_spread_tracker::backfill;
use epl_spread_tracker::config::Config;
use epl_spread_tracker::fetch::OddsApiClient;
use epl_spread_tracker::report::{TEAM_REPORT_FILE, UPCOMING_REPORT_FILE};
use epl_spread_tracker::store::{write_report, SnapshotStore};
use epl_spread_tracker::{PipelineContext, PipelineInput};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Pull fresh spreads, scores and h2h odds into the store.
///
/// Each fetch and each write stands alone: a failure is logged and the run
/// carries on with whatever is already on disk.
async fn fetch_latest(config: &Config, store: &SnapshotStore) {
    let client = match OddsApiClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            error!("Cannot create Odds API client: {:?}", e);
            return;
        }
    };
    let now = Utc::now();

    let (spreads, scores, h2h) = tokio::join!(
        client.fetch_spreads(&config.spread_regions, &config.spread_bookmakers),
        client.fetch_scores(config.scores_days_from),
        client.fetch_h2h(&config.h2h_regions, config.h2h_bookmakers.as_deref()),
    );

    match spreads {
        Ok(payload) => match store.write_spread_snapshot(&payload, now).await {
            Ok(path) => info!("Saved spreads to {}", path.display()),
            Err(e) => error!("Failed to save spreads: {:?}", e),
        },
        Err(e) => error!("Spread fetch failed: {:?}", e),
    }

    match scores {
        Ok(payload) => {
            if let Err(e) = store.merge_scores(&payload).await {
                error!("Failed to merge scores: {:?}", e);
            }
        }
        Err(e) => error!("Scores fetch failed: {:?}", e),
    }

    match h2h {
        Ok(payload) => match store.write_h2h_snapshot(&payload, now).await {
            Ok(path) => info!("Saved h2h odds to {}", path.display()),
            Err(e) => error!("Failed to save h2h odds: {:?}", e),
        },
        Err(e) => error!("H2H fetch failed: {:?}", e),
    }
}

/// Load a football-data.co.uk season into the store: spreads go to their
/// own snapshot, scores fill fixtures the scores feed never saw.
async fn run_backfill(source: &str, store: &SnapshotStore) -> Result<()> {
    let text = backfill::read_source(source).await?;
    let season = backfill::parse_season_csv(&text)
        .with_context(|| format!("Cannot backfill from {}", source))?;
    let unrecognized: Vec<&str> = season
        .audit
        .unrecognized()
        .iter()
        .map(String::as_str)
        .collect();
    if !unrecognized.is_empty() {
        warn!("Backfill has unrecognized team names: {}", unrecognized.join(", "));
    }

    let path = store.write_backfill_spreads(&season.spreads).await?;
    info!(
        "Saved {} backfilled spreads to {}",
        season.spreads.len(),
        path.display()
    );
    store.merge_backfill_scores(&season.scores).await?;
    Ok(())
}

async fn run(config: &Config) -> Result<()> {
    let store = SnapshotStore::new(&config.data_dir);

    if config.run_fetch {
        let start = Instant::now();
        fetch_latest(config, &store).await;
        info!("Fetch step completed in {:?}", start.elapsed());
    } else if config.odds_api_key.is_none() {
        warn!("ODDS_API_KEY not set; analyzing stored snapshots only");
    } else {
        info!("RUN_FETCH=false: analyzing stored snapshots only");
    }

    if let Some(source) = &config.backfill_csv {
        if let Err(e) = run_backfill(source, &store).await {
            error!("Backfill failed: {:?}", e);
        }
    }

    let (spread_snapshots, results, h2h_snapshots) = tokio::try_join!(
        store.read_spread_snapshots(),
        store.read_results(),
        store.read_h2h_snapshots(),
    )?;
    info!(
        "Loaded {} spread snapshots and {} h2h snapshots from {}",
        spread_snapshots.len(),
        h2h_snapshots.len(),
        store.data_dir().display()
    );

    let input = PipelineInput {
        spread_snapshots,
        results,
        h2h_snapshots,
        now: Utc::now(),
    };
    let context = PipelineContext::build(&input).context("Analysis aborted")?;

    let team_report = context.team_report();
    let upcoming_report = context.upcoming_report();
    if team_report.skipped.total() > 0 {
        warn!(
            "Skipped {} malformed snapshots/records during the run",
            team_report.skipped.total()
        );
    }
    if !team_report.unrecognized_teams.is_empty() {
        warn!(
            "Unrecognized team names: {}",
            team_report.unrecognized_teams.join(", ")
        );
    }

    let (team_result, upcoming_result) = tokio::join!(
        write_report(&config.output_dir, TEAM_REPORT_FILE, &team_report),
        write_report(&config.output_dir, UPCOMING_REPORT_FILE, &upcoming_report)
    );
    team_result?;
    upcoming_result?;

    info!(
        "Tracked {} teams over {} of {} matches; {} upcoming fixtures",
        team_report.teams_tracked,
        team_report.matches_analyzed,
        team_report.total_matches,
        upcoming_report.total_matches
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env for local runs
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("epl_spread_tracker=info".parse()?),
        )
        .init();

    info!("EPL Spread Tracker v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    if let Err(e) = run(&config).await {
        error!("Pipeline failed: {:?}", e);
        return Err(e);
    }
    Ok(())
}

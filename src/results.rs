//! Completed-match loading from `/scores` payloads.

use crate::fixture::MatchKey;
use crate::odds_api::{
    decode, event_list, parse_score, required, LoadStats, RecordError, ScoreEvent,
};
use crate::teams::{normalize_from, DataSource, NameAudit};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub id: String,
    pub match_key: MatchKey,
    pub home_score: u16,
    pub away_score: u16,
    pub completed: bool,
}

impl MatchResult {
    /// Home goals minus away goals.
    pub fn goal_difference(&self) -> i32 {
        i32::from(self.home_score) - i32::from(self.away_score)
    }
}

#[derive(Debug, Default)]
pub struct ResultLoad {
    pub results: Vec<MatchResult>,
    pub stats: LoadStats,
    pub audit: NameAudit,
    /// Completed records without a clean score for both sides.
    pub unscored: usize,
    /// Records whose fixture was already loaded.
    pub duplicates: usize,
}

/// Load completed results. Only a payload that is not a list at all is an
/// error; bad records are counted and skipped.
pub fn load_results(payload: &Value) -> Result<ResultLoad, RecordError> {
    let events = event_list(payload)?;
    let mut load = ResultLoad::default();
    let mut seen: HashSet<MatchKey> = HashSet::new();
    load.stats.snapshots_read = 1;

    for raw in events {
        load.stats.records_read += 1;
        let event: ScoreEvent = match decode(raw) {
            Ok(event) => event,
            Err(e) => {
                debug!("Malformed score record: {}", e);
                load.stats.records_skipped += 1;
                continue;
            }
        };
        if !event.completed {
            continue;
        }

        match to_result(&event, &mut load.audit) {
            Ok(Some(result)) => {
                if seen.insert(result.match_key.clone()) {
                    load.results.push(result);
                } else {
                    debug!("Duplicate result for {}", result.match_key);
                    load.duplicates += 1;
                }
            }
            Ok(None) => load.unscored += 1,
            Err(e) => {
                debug!("Malformed score record: {}", e);
                load.stats.records_skipped += 1;
            }
        }
    }

    if load.stats.records_skipped > 0 {
        warn!("Skipped {} malformed score records", load.stats.records_skipped);
    }
    info!(
        "Loaded {} completed results ({} without final scores)",
        load.results.len(),
        load.unscored
    );
    Ok(load)
}

fn to_result(
    event: &ScoreEvent,
    audit: &mut NameAudit,
) -> Result<Option<MatchResult>, RecordError> {
    let home_raw = required(&event.home_team, "home_team")?;
    let away_raw = required(&event.away_team, "away_team")?;
    let commence = required(&event.commence_time, "commence_time")?;

    let home = audit.resolve(DataSource::OddsApi, home_raw);
    let away = audit.resolve(DataSource::OddsApi, away_raw);

    let mut home_score = None;
    let mut away_score = None;
    for entry in event.scores.iter().flatten() {
        let team = normalize_from(DataSource::OddsApi, &entry.name);
        let score = entry.score.as_ref().and_then(parse_score);
        if team == home {
            home_score = score;
        } else if team == away {
            away_score = score;
        }
    }

    let (Some(home_score), Some(away_score)) = (home_score, away_score) else {
        return Ok(None);
    };

    Ok(Some(MatchResult {
        id: event.id.clone().unwrap_or_default(),
        match_key: MatchKey::new(home, away, commence),
        home_score,
        away_score,
        completed: true,
    }))
}

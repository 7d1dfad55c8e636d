//! Output documents handed to the persistence/rendering side.

use crate::aggregate::TeamAggregate;
use crate::correlation::Correlation;
use crate::odds_api::LoadStats;
use crate::serde_utils::round3_opt;
use crate::upcoming::UpcomingMatch;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const TEAM_REPORT_FILE: &str = "team-performance-history.json";
pub const UPCOMING_REPORT_FILE: &str = "latest-odds.json";

/// What each loader had to drop during the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipSummary {
    pub spreads: LoadStats,
    pub results: LoadStats,
    pub h2h: LoadStats,
    /// Completed results with no clean final score.
    pub unscored_results: usize,
    pub duplicate_results: usize,
}

impl SkipSummary {
    pub fn total(&self) -> usize {
        self.spreads.skipped() + self.results.skipped() + self.h2h.skipped()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamReport {
    pub last_updated: DateTime<Utc>,
    /// Ranked by total net performance.
    pub teams: Vec<TeamAggregate>,
    pub bookmakers: Vec<String>,
    /// `null` when undefined (fewer than two matches).
    #[serde(serialize_with = "round3_opt")]
    pub correlation: Option<f64>,
    pub correlation_samples: usize,
    /// Completed results, with or without a spread.
    pub total_matches: usize,
    /// Completed results that had a spread and entered the standings.
    pub matches_analyzed: usize,
    /// Of those, how many used the matchup fallback.
    pub matchup_fallbacks: usize,
    pub teams_tracked: usize,
    pub skipped: SkipSummary,
    pub unrecognized_teams: Vec<String>,
}

impl TeamReport {
    pub fn correlation_result(&self) -> Correlation {
        match self.correlation {
            Some(coefficient) => Correlation::Defined {
                coefficient,
                samples: self.correlation_samples,
            },
            None => Correlation::Undefined {
                samples: self.correlation_samples,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingReport {
    pub last_updated: DateTime<Utc>,
    pub upcoming_matches: Vec<UpcomingMatch>,
    pub bookmakers: Vec<String>,
    pub total_matches: usize,
}

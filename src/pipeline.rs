//! One analysis run over fully materialized inputs.
//!
//! [`PipelineContext`] is built once per run from everything the store or
//! fetcher collected, and every stage reads from it. Nothing here touches
//! the network or the filesystem.

use crate::aggregate::aggregate;
use crate::consensus::{self, SpreadLookup, SpreadMatch};
use crate::correlation::{correlate, Correlation};
use crate::fixture::MatchKey;
use crate::odds_api::{RecordError, Snapshot};
use crate::performance::{compute, PerformanceRecord};
use crate::report::{SkipSummary, TeamReport, UpcomingReport};
use crate::results::{load_results, ResultLoad};
use crate::spreads::{load_spreads, SpreadLoad};
use crate::teams::NameAudit;
use crate::upcoming::{load_h2h, upcoming_view, H2hLoad};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Structural failures. Anything smaller is absorbed by the loaders.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("results payload is not a list of score records: {0}")]
    MalformedResults(RecordError),
    #[error(
        "no usable input: {snapshots_skipped} spread snapshots unreadable, \
         {records_skipped} result records malformed, nothing left to analyze"
    )]
    NoUsableInput {
        snapshots_skipped: usize,
        records_skipped: usize,
    },
}

/// Raw inputs for one run. Snapshots must already be in capture order.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub spread_snapshots: Vec<Snapshot>,
    pub results: Value,
    pub h2h_snapshots: Vec<Snapshot>,
    /// Reference time for "upcoming" and report timestamps.
    pub now: DateTime<Utc>,
}

/// Performance records for every fixture with both a result and a spread.
#[derive(Debug, Clone, Default)]
pub struct PerformanceRun {
    pub records: Vec<PerformanceRecord>,
    pub expected_margins: Vec<f64>,
    pub actual_margins: Vec<f64>,
    pub bookmakers: BTreeSet<String>,
    pub matches_analyzed: usize,
    pub without_spread: usize,
    pub matchup_fallbacks: usize,
}

impl PerformanceRun {
    pub fn correlation(&self) -> Correlation {
        correlate(&self.expected_margins, &self.actual_margins)
    }
}

pub struct PipelineContext {
    spreads: SpreadLoad,
    results: ResultLoad,
    h2h: H2hLoad,
    now: DateTime<Utc>,
}

impl PipelineContext {
    pub fn build(input: &PipelineInput) -> Result<Self, PipelineError> {
        let results = load_results(&input.results).map_err(PipelineError::MalformedResults)?;
        let spreads = load_spreads(&input.spread_snapshots);
        let h2h = load_h2h(&input.h2h_snapshots, input.now);

        if results.results.is_empty() && spreads.stats.snapshots_read == 0 && h2h.is_empty() {
            return Err(PipelineError::NoUsableInput {
                snapshots_skipped: spreads.stats.snapshots_skipped,
                records_skipped: results.stats.records_skipped,
            });
        }

        Ok(Self {
            spreads,
            results,
            h2h,
            now: input.now,
        })
    }

    pub fn spread_for(&self, key: &MatchKey) -> Option<SpreadLookup> {
        consensus::lookup(&self.spreads.index, key)
    }

    pub fn performance(&self) -> PerformanceRun {
        let mut run = PerformanceRun::default();

        for result in &self.results.results {
            let Some(found) = self.spread_for(&result.match_key) else {
                debug!("No spread for {}; excluded from standings", result.match_key);
                run.without_spread += 1;
                continue;
            };
            if found.matched_by == SpreadMatch::Matchup {
                run.matchup_fallbacks += 1;
            }

            let perf = compute(result, &found.spread);
            run.bookmakers.extend(found.spread.bookmakers().map(str::to_string));
            run.expected_margins.push(perf.expected_margin);
            run.actual_margins.push(perf.actual_margin);
            run.records.push(perf.home);
            run.records.push(perf.away);
            run.matches_analyzed += 1;
        }

        info!(
            "Computed performance for {} of {} completed matches \
             ({} without spread, {} via matchup fallback)",
            run.matches_analyzed,
            self.results.results.len(),
            run.without_spread,
            run.matchup_fallbacks
        );
        run
    }

    pub fn team_report(&self) -> TeamReport {
        let run = self.performance();
        let correlation = run.correlation();
        match correlation {
            Correlation::Defined { coefficient, samples } => {
                info!("Correlation {:.3} over {} matches", coefficient, samples)
            }
            Correlation::Undefined { samples } => {
                warn!("Correlation undefined ({} matches with spread and result)", samples)
            }
        }

        let bookmakers = run.bookmakers.iter().cloned().collect();
        let matches_analyzed = run.matches_analyzed;
        let matchup_fallbacks = run.matchup_fallbacks;
        let teams = aggregate(run.records).ranked().into_teams();

        TeamReport {
            last_updated: self.now,
            teams_tracked: teams.len(),
            teams,
            bookmakers,
            correlation: correlation.coefficient(),
            correlation_samples: correlation.samples(),
            total_matches: self.results.results.len(),
            matches_analyzed,
            matchup_fallbacks,
            skipped: self.skipped(),
            unrecognized_teams: self.unrecognized_teams().into_iter().collect(),
        }
    }

    pub fn upcoming_report(&self) -> UpcomingReport {
        let view = upcoming_view(&self.h2h, &self.spreads.index);
        UpcomingReport {
            last_updated: self.now,
            total_matches: view.matches.len(),
            upcoming_matches: view.matches,
            bookmakers: view.bookmakers.into_iter().collect(),
        }
    }

    pub fn skipped(&self) -> SkipSummary {
        SkipSummary {
            spreads: self.spreads.stats,
            results: self.results.stats,
            h2h: self.h2h.stats,
            unscored_results: self.results.unscored,
            duplicate_results: self.results.duplicates,
        }
    }

    /// Raw names, from any source, that matched no known club.
    pub fn unrecognized_teams(&self) -> BTreeSet<String> {
        let mut audit = NameAudit::new();
        audit.merge(self.spreads.audit.clone());
        audit.merge(self.results.audit.clone());
        audit.merge(self.h2h.audit.clone());
        audit.unrecognized().clone()
    }
}

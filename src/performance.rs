//! Net performance against the handicap.
//!
//! `net = actual goal difference + own handicap`. A home side at -1.5 that
//! wins 3-0 scores +1.5; the away side scores -1.5. The two sides of a
//! fixture always sum to zero.

use crate::consensus::ConsolidatedSpread;
use crate::results::MatchResult;
use crate::serde_utils::{round2, round2_map};
use crate::teams::TeamName;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchOutcome {
    W,
    L,
    D,
}

impl MatchOutcome {
    fn from_goal_difference(diff: i32) -> Self {
        match diff.cmp(&0) {
            std::cmp::Ordering::Greater => MatchOutcome::W,
            std::cmp::Ordering::Less => MatchOutcome::L,
            std::cmp::Ordering::Equal => MatchOutcome::D,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Home,
    Away,
}

/// One team's view of one fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    #[serde(skip)]
    pub team: TeamName,
    pub date: String,
    pub opponent: TeamName,
    #[serde(rename = "homeAway")]
    pub venue: Venue,
    /// Own goals first, e.g. `"1-3"` for an away side that won 3-1.
    pub score: String,
    pub result: MatchOutcome,
    /// Own handicap (consensus).
    #[serde(serialize_with = "round2")]
    pub spread: f64,
    #[serde(serialize_with = "round2")]
    pub net_performance: f64,
    #[serde(serialize_with = "round2_map")]
    pub net_performance_by_bookmaker: BTreeMap<String, f64>,
    /// Filled in by the aggregator after date ordering.
    #[serde(serialize_with = "round2")]
    pub cumulative_net_performance: f64,
}

impl PerformanceRecord {
    /// Beat the consensus line, win or lose.
    pub fn covered(&self) -> bool {
        self.net_performance > 0.0
    }

    pub fn covered_with(&self, bookmaker: &str) -> Option<bool> {
        self.net_performance_by_bookmaker.get(bookmaker).map(|net| *net > 0.0)
    }
}

/// Both sides of a fixture plus the home-perspective margins used for
/// correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPerformance {
    pub home: PerformanceRecord,
    pub away: PerformanceRecord,
    /// Margin the handicap implies for the home side (`-spread`).
    pub expected_margin: f64,
    pub actual_margin: f64,
}

pub fn net_performance(goal_difference: f64, spread: f64) -> f64 {
    goal_difference + spread
}

pub fn compute(result: &MatchResult, spread: &ConsolidatedSpread) -> MatchPerformance {
    let key = &result.match_key;
    let diff = result.goal_difference();
    let actual = f64::from(diff);
    let home_spread = spread.consensus;
    let date = key.date();

    let home_outcome = MatchOutcome::from_goal_difference(diff);
    let away_outcome = MatchOutcome::from_goal_difference(-diff);

    let home_by_bookmaker = spread
        .by_bookmaker
        .iter()
        .map(|(bookmaker, point)| (bookmaker.clone(), net_performance(actual, *point)))
        .collect();
    let away_by_bookmaker = spread
        .by_bookmaker
        .iter()
        .map(|(bookmaker, point)| (bookmaker.clone(), net_performance(-actual, -*point)))
        .collect();

    let home = PerformanceRecord {
        team: key.home.clone(),
        date: date.clone(),
        opponent: key.away.clone(),
        venue: Venue::Home,
        score: format!("{}-{}", result.home_score, result.away_score),
        result: home_outcome,
        spread: home_spread,
        net_performance: net_performance(actual, home_spread),
        net_performance_by_bookmaker: home_by_bookmaker,
        cumulative_net_performance: 0.0,
    };
    let away = PerformanceRecord {
        team: key.away.clone(),
        date,
        opponent: key.home.clone(),
        venue: Venue::Away,
        score: format!("{}-{}", result.away_score, result.home_score),
        result: away_outcome,
        spread: -home_spread,
        net_performance: net_performance(-actual, -home_spread),
        net_performance_by_bookmaker: away_by_bookmaker,
        cumulative_net_performance: 0.0,
    };

    MatchPerformance {
        home,
        away,
        expected_margin: -home_spread,
        actual_margin: actual,
    }
}

//! Per-team roll-up of performance records.

use crate::performance::{MatchOutcome, PerformanceRecord};
use crate::serde_utils::{round2, round3};
use crate::teams::TeamName;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStatistics {
    pub matches_played: usize,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
    /// Matches with positive net performance against the consensus.
    pub covers: usize,
    #[serde(serialize_with = "round2")]
    pub avg_net_performance: f64,
    #[serde(serialize_with = "round3")]
    pub win_rate: f64,
    #[serde(serialize_with = "round3")]
    pub cover_rate: f64,
}

/// Cover record against one bookmaker's lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmakerRecord {
    pub covers: usize,
    pub total: usize,
    #[serde(serialize_with = "round3")]
    pub cover_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAggregate {
    pub name: TeamName,
    /// Date ascending.
    pub match_history: Vec<PerformanceRecord>,
    #[serde(serialize_with = "round2")]
    pub total_net_performance: f64,
    pub statistics: TeamStatistics,
    pub by_bookmaker: BTreeMap<String, BookmakerRecord>,
}

impl TeamAggregate {
    fn new(name: TeamName) -> Self {
        Self {
            name,
            match_history: Vec::new(),
            total_net_performance: 0.0,
            statistics: TeamStatistics::default(),
            by_bookmaker: BTreeMap::new(),
        }
    }

    fn push(&mut self, record: PerformanceRecord) {
        let stats = &mut self.statistics;
        stats.matches_played += 1;
        match record.result {
            MatchOutcome::W => stats.wins += 1,
            MatchOutcome::L => stats.losses += 1,
            MatchOutcome::D => stats.draws += 1,
        }
        if record.covered() {
            stats.covers += 1;
        }

        for bookmaker in record.net_performance_by_bookmaker.keys() {
            let entry = self.by_bookmaker.entry(bookmaker.clone()).or_default();
            entry.total += 1;
            if record.covered_with(bookmaker) == Some(true) {
                entry.covers += 1;
            }
        }

        self.match_history.push(record);
    }

    /// Sort history by date (stable), assign running totals, derive rates.
    fn finish(&mut self) {
        self.match_history.sort_by(|a, b| a.date.cmp(&b.date));

        let mut cumulative = 0.0;
        for record in &mut self.match_history {
            cumulative += record.net_performance;
            record.cumulative_net_performance = cumulative;
        }
        self.total_net_performance = cumulative;

        let stats = &mut self.statistics;
        if stats.matches_played > 0 {
            let played = stats.matches_played as f64;
            stats.avg_net_performance = cumulative / played;
            stats.win_rate = stats.wins as f64 / played;
            stats.cover_rate = stats.covers as f64 / played;
        }
        for record in self.by_bookmaker.values_mut() {
            if record.total > 0 {
                record.cover_rate = record.covers as f64 / record.total as f64;
            }
        }
    }
}

/// All teams, in first-seen order until ranked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Standings {
    teams: Vec<TeamAggregate>,
}

impl Standings {
    pub fn get(&self, name: &TeamName) -> Option<&TeamAggregate> {
        self.teams.iter().find(|team| &team.name == name)
    }

    pub fn teams(&self) -> &[TeamAggregate] {
        &self.teams
    }

    pub fn into_teams(self) -> Vec<TeamAggregate> {
        self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Descending total net performance; ties keep first-seen order.
    pub fn ranked(mut self) -> Self {
        self.teams.sort_by(|a, b| {
            b.total_net_performance
                .partial_cmp(&a.total_net_performance)
                .unwrap_or(Ordering::Equal)
        });
        self
    }
}

/// Group records by team and recompute every aggregate from scratch.
pub fn aggregate(records: impl IntoIterator<Item = PerformanceRecord>) -> Standings {
    let mut positions: HashMap<TeamName, usize> = HashMap::new();
    let mut teams: Vec<TeamAggregate> = Vec::new();

    for record in records {
        let slot = *positions.entry(record.team.clone()).or_insert_with(|| {
            teams.push(TeamAggregate::new(record.team.clone()));
            teams.len() - 1
        });
        teams[slot].push(record);
    }

    for team in &mut teams {
        team.finish();
    }
    Standings { teams }
}

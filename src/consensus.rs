//! Quote consolidation: per-bookmaker lines plus their consensus.

use crate::fixture::MatchKey;
use crate::spreads::{SpreadIndex, SpreadQuote};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Arithmetic mean of the quotes, `None` when there are none.
pub fn consensus(quotes: &BTreeMap<String, f64>) -> Option<f64> {
    if quotes.is_empty() {
        return None;
    }
    Some(quotes.values().sum::<f64>() / quotes.len() as f64)
}

/// Market expectation for one fixture. Both views travel together.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedSpread {
    pub match_key: MatchKey,
    pub by_bookmaker: BTreeMap<String, f64>,
    pub consensus: f64,
}

impl ConsolidatedSpread {
    pub fn from_quotes(
        match_key: MatchKey,
        quotes: &BTreeMap<String, SpreadQuote>,
    ) -> Option<Self> {
        let by_bookmaker: BTreeMap<String, f64> = quotes
            .iter()
            .map(|(bookmaker, quote)| (bookmaker.clone(), quote.point))
            .collect();
        let consensus = consensus(&by_bookmaker)?;
        Some(Self {
            match_key,
            by_bookmaker,
            consensus,
        })
    }

    pub fn bookmakers(&self) -> impl Iterator<Item = &str> {
        self.by_bookmaker.keys().map(String::as_str)
    }
}

/// How a spread was attached to a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SpreadMatch {
    /// Same home, away and kickoff string.
    Exact,
    /// Same home and away, different (or unknown) kickoff. May be a stale
    /// line from another meeting of the two clubs.
    Matchup,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpreadLookup {
    pub spread: ConsolidatedSpread,
    pub matched_by: SpreadMatch,
}

pub fn lookup_exact(index: &SpreadIndex, key: &MatchKey) -> Option<ConsolidatedSpread> {
    index
        .get(key)
        .and_then(|quotes| ConsolidatedSpread::from_quotes(key.clone(), quotes))
}

/// Any recorded spread for the same pairing, first seen wins.
pub fn lookup_matchup(index: &SpreadIndex, key: &MatchKey) -> Option<ConsolidatedSpread> {
    let (found, quotes) = index.first_for_matchup(&key.home, &key.away)?;
    ConsolidatedSpread::from_quotes(found.clone(), quotes)
}

/// Exact join first, then the matchup fallback.
pub fn lookup(index: &SpreadIndex, key: &MatchKey) -> Option<SpreadLookup> {
    if let Some(spread) = lookup_exact(index, key) {
        return Some(SpreadLookup {
            spread,
            matched_by: SpreadMatch::Exact,
        });
    }

    let spread = lookup_matchup(index, key)?;
    info!(
        "No spread for {}; using matchup line from {}",
        key, spread.match_key.commence_time
    );
    Some(SpreadLookup {
        spread,
        matched_by: SpreadMatch::Matchup,
    })
}

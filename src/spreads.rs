//! Spread snapshot loading.
//!
//! Folds every captured `/odds?markets=spreads` payload into one index of
//! the latest home-team handicap per fixture per bookmaker.

use crate::fixture::MatchKey;
use crate::odds_api::{
    decode, event_list, required, LoadStats, OddsApiEvent, RecordError, Snapshot, SPREADS_MARKET,
};
use crate::teams::{normalize_from, DataSource, NameAudit, TeamName};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// One bookmaker's home handicap as seen in one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadQuote {
    pub bookmaker: String,
    pub point: f64,
    pub observed_in: String,
}

/// Latest quote per fixture per bookmaker. Fixtures iterate in the order
/// they were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadIndex {
    order: Vec<MatchKey>,
    quotes: HashMap<MatchKey, BTreeMap<String, SpreadQuote>>,
}

impl SpreadIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a quote, replacing any earlier one from the same bookmaker.
    pub fn insert(&mut self, key: MatchKey, quote: SpreadQuote) {
        if !self.quotes.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.quotes
            .entry(key)
            .or_default()
            .insert(quote.bookmaker.clone(), quote);
    }

    pub fn get(&self, key: &MatchKey) -> Option<&BTreeMap<String, SpreadQuote>> {
        self.quotes.get(key)
    }

    /// First fixture (in insertion order) between `home` and `away`,
    /// whatever its kickoff.
    pub fn first_for_matchup(
        &self,
        home: &TeamName,
        away: &TeamName,
    ) -> Option<(&MatchKey, &BTreeMap<String, SpreadQuote>)> {
        self.order
            .iter()
            .find(|key| key.same_matchup(home, away))
            .and_then(|key| self.quotes.get(key).map(|quotes| (key, quotes)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Collapse Asian quarter lines onto the nearest half-goal line, keeping
/// the sign: `0.25 -> 0.5`, `0.75 -> 0.5`, `-1.75 -> -1.5`.
pub fn snap_quarter_line(point: f64) -> f64 {
    let magnitude = point.abs();
    let fraction = magnitude - magnitude.trunc();
    let snapped = if fraction == 0.25 {
        magnitude + 0.25
    } else if fraction == 0.75 {
        magnitude - 0.25
    } else {
        return point;
    };
    snapped.copysign(point)
}

#[derive(Debug, Default)]
pub struct SpreadLoad {
    pub index: SpreadIndex,
    pub stats: LoadStats,
    pub audit: NameAudit,
}

/// Load spread snapshots in the order given. Callers feed them
/// chronologically; a later snapshot overwrites an earlier one for the same
/// fixture and bookmaker, so out-of-order input keeps the wrong line.
pub fn load_spreads(snapshots: &[Snapshot]) -> SpreadLoad {
    let mut load = SpreadLoad::default();

    for snapshot in snapshots {
        let events = match event_list(&snapshot.payload) {
            Ok(events) => events,
            Err(e) => {
                warn!("Skipping spread snapshot {}: {}", snapshot.id, e);
                load.stats.snapshots_skipped += 1;
                continue;
            }
        };
        load.stats.snapshots_read += 1;

        let mut skipped = 0;
        for raw in events {
            load.stats.records_read += 1;
            let event: OddsApiEvent = match decode(raw) {
                Ok(event) => event,
                Err(e) => {
                    debug!("Malformed event in {}: {}", snapshot.id, e);
                    skipped += 1;
                    continue;
                }
            };
            if let Err(e) = index_event(&mut load, &snapshot.id, &event) {
                debug!("Malformed event in {}: {}", snapshot.id, e);
                skipped += 1;
            }
        }

        if skipped > 0 {
            warn!("Skipped {} malformed events in {}", skipped, snapshot.id);
        }
        load.stats.records_skipped += skipped;
    }

    info!(
        "Loaded {} fixtures with spreads from {} snapshots ({} skipped)",
        load.index.len(),
        load.stats.snapshots_read,
        load.stats.snapshots_skipped
    );
    load
}

fn index_event(
    load: &mut SpreadLoad,
    snapshot_id: &str,
    event: &OddsApiEvent,
) -> Result<(), RecordError> {
    let home_raw = required(&event.home_team, "home_team")?;
    let away_raw = required(&event.away_team, "away_team")?;
    let commence = required(&event.commence_time, "commence_time")?;

    let home = load.audit.resolve(DataSource::OddsApi, home_raw);
    let away = load.audit.resolve(DataSource::OddsApi, away_raw);
    let key = MatchKey::new(home, away, commence);

    for bookmaker in &event.bookmakers {
        let Some(market) = bookmaker.market(SPREADS_MARKET) else {
            continue;
        };
        let home_point = market
            .outcomes
            .iter()
            .find(|o| normalize_from(DataSource::OddsApi, &o.name) == key.home)
            .and_then(|o| o.point);

        if let Some(point) = home_point {
            load.index.insert(
                key.clone(),
                SpreadQuote {
                    bookmaker: bookmaker.id().to_string(),
                    point: snap_quarter_line(point),
                    observed_in: snapshot_id.to_string(),
                },
            );
        }
    }
    Ok(())
}

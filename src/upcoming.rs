//! Upcoming fixtures: latest head-to-head prices merged with spreads.

use crate::consensus::{self, SpreadMatch};
use crate::fixture::MatchKey;
use crate::odds_api::{
    decode, event_list, required, LoadStats, OddsApiEvent, RecordError, Snapshot, H2H_MARKET,
};
use crate::serde_utils::{round2, round2_map, round3};
use crate::spreads::SpreadIndex;
use crate::teams::{normalize_from, DataSource, NameAudit};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

const DRAW: &str = "Draw";

/// Latest 1X2 prices for one event, decimal odds.
#[derive(Debug, Clone, PartialEq)]
pub struct H2hQuote {
    pub event_id: String,
    pub match_key: MatchKey,
    pub bookmaker: String,
    pub last_update: Option<String>,
    pub home_price: Option<f64>,
    pub draw_price: Option<f64>,
    pub away_price: Option<f64>,
}

#[derive(Debug, Default)]
pub struct H2hLoad {
    order: Vec<String>,
    quotes: HashMap<String, H2hQuote>,
    pub stats: LoadStats,
    pub audit: NameAudit,
}

impl H2hLoad {
    pub fn get(&self, event_id: &str) -> Option<&H2hQuote> {
        self.quotes.get(event_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &H2hQuote> {
        self.order.iter().filter_map(|id| self.quotes.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn insert(&mut self, quote: H2hQuote) {
        if !self.quotes.contains_key(&quote.event_id) {
            self.order.push(quote.event_id.clone());
        }
        self.quotes.insert(quote.event_id.clone(), quote);
    }
}

/// Load h2h snapshots in the order given; the last quote per event wins.
/// Events that kicked off before `now` are dropped.
pub fn load_h2h(snapshots: &[Snapshot], now: DateTime<Utc>) -> H2hLoad {
    let mut load = H2hLoad::default();

    for snapshot in snapshots {
        let events = match event_list(&snapshot.payload) {
            Ok(events) => events,
            Err(e) => {
                warn!("Skipping h2h snapshot {}: {}", snapshot.id, e);
                load.stats.snapshots_skipped += 1;
                continue;
            }
        };
        load.stats.snapshots_read += 1;

        for raw in events {
            load.stats.records_read += 1;
            let parsed = decode::<OddsApiEvent>(raw)
                .and_then(|event| h2h_quote(&event, now, &mut load.audit));
            match parsed {
                Ok(Some(quote)) => load.insert(quote),
                Ok(None) => {}
                Err(e) => {
                    debug!("Malformed h2h event in {}: {}", snapshot.id, e);
                    load.stats.records_skipped += 1;
                }
            }
        }
    }

    info!("Loaded h2h odds for {} upcoming matches", load.len());
    load
}

fn h2h_quote(
    event: &OddsApiEvent,
    now: DateTime<Utc>,
    audit: &mut NameAudit,
) -> Result<Option<H2hQuote>, RecordError> {
    let event_id = required(&event.id, "id")?;
    let home_raw = required(&event.home_team, "home_team")?;
    let away_raw = required(&event.away_team, "away_team")?;
    let commence = required(&event.commence_time, "commence_time")?;

    // Unparseable kickoffs are kept rather than guessed at.
    if let Ok(kickoff) = DateTime::parse_from_rfc3339(commence) {
        if kickoff.with_timezone(&Utc) < now {
            return Ok(None);
        }
    }

    let Some(bookmaker) = event.bookmakers.first() else {
        return Ok(None);
    };
    let Some(market) = bookmaker.market(H2H_MARKET) else {
        return Ok(None);
    };

    let home = audit.resolve(DataSource::OddsApi, home_raw);
    let away = audit.resolve(DataSource::OddsApi, away_raw);
    let mut quote = H2hQuote {
        event_id: event_id.to_string(),
        match_key: MatchKey::new(home, away, commence),
        bookmaker: bookmaker.title.clone().unwrap_or_else(|| bookmaker.id().to_string()),
        last_update: bookmaker.last_update.clone(),
        home_price: None,
        draw_price: None,
        away_price: None,
    };

    for outcome in &market.outcomes {
        if outcome.name == DRAW {
            quote.draw_price = outcome.price;
            continue;
        }
        let team = normalize_from(DataSource::OddsApi, &outcome.name);
        if team == quote.match_key.home {
            quote.home_price = outcome.price;
        } else if team == quote.match_key.away {
            quote.away_price = outcome.price;
        }
    }
    Ok(Some(quote))
}

/// `1 / decimal`, or 0 when there is no usable price.
pub fn implied_probability(decimal_odds: Option<f64>) -> f64 {
    match decimal_odds {
        Some(price) if price > 0.0 => 1.0 / price,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct H2hOdds {
    pub bookmaker: String,
    pub last_update: Option<String>,
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
    #[serde(serialize_with = "round3")]
    pub implied_prob_home: f64,
    #[serde(serialize_with = "round3")]
    pub implied_prob_draw: f64,
    #[serde(serialize_with = "round3")]
    pub implied_prob_away: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingSpread {
    #[serde(serialize_with = "round2")]
    pub home_point: f64,
    #[serde(serialize_with = "round2")]
    pub away_point: f64,
    #[serde(serialize_with = "round2_map")]
    pub by_bookmaker: BTreeMap<String, f64>,
    pub matched_by: SpreadMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingMatch {
    pub id: String,
    pub commence_time: String,
    pub home_team: String,
    pub away_team: String,
    pub h2h_odds: H2hOdds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread: Option<UpcomingSpread>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpcomingView {
    pub matches: Vec<UpcomingMatch>,
    pub bookmakers: BTreeSet<String>,
}

/// Merge every loaded h2h quote with its spread and order by kickoff.
pub fn upcoming_view(h2h: &H2hLoad, spreads: &SpreadIndex) -> UpcomingView {
    let mut view = UpcomingView::default();

    for quote in h2h.iter() {
        let spread = consensus::lookup(spreads, &quote.match_key).map(|found| {
            view.bookmakers.extend(found.spread.bookmakers().map(str::to_string));
            UpcomingSpread {
                home_point: found.spread.consensus,
                away_point: -found.spread.consensus,
                by_bookmaker: found.spread.by_bookmaker,
                matched_by: found.matched_by,
            }
        });

        view.matches.push(UpcomingMatch {
            id: quote.event_id.clone(),
            commence_time: quote.match_key.commence_time.clone(),
            home_team: quote.match_key.home.to_string(),
            away_team: quote.match_key.away.to_string(),
            h2h_odds: H2hOdds {
                bookmaker: quote.bookmaker.clone(),
                last_update: quote.last_update.clone(),
                home: quote.home_price,
                draw: quote.draw_price,
                away: quote.away_price,
                implied_prob_home: implied_probability(quote.home_price),
                implied_prob_draw: implied_probability(quote.draw_price),
                implied_prob_away: implied_probability(quote.away_price),
            },
            spread,
        });
    }

    view.matches.sort_by(|a, b| a.commence_time.cmp(&b.commence_time));
    view
}

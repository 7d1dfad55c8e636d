//! The Odds API record schemas.
//!
//! Every field the feed may omit is optional here. Loaders validate each
//! record once and hand the rest of the crate fully-typed values.

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

pub const SPREADS_MARKET: &str = "spreads";
pub const H2H_MARKET: &str = "h2h";

/// Event from `/v4/sports/{sport}/odds`
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OddsApiEvent {
    pub id: Option<String>,
    pub sport_key: Option<String>,
    pub commence_time: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Bookmaker {
    pub key: Option<String>,
    pub title: Option<String>,
    pub last_update: Option<String>,
    pub markets: Vec<Market>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Market {
    pub key: String,
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Outcome {
    pub name: String,
    pub price: Option<f64>,
    pub point: Option<f64>,
}

/// Event from `/v4/sports/{sport}/scores`
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ScoreEvent {
    pub id: Option<String>,
    pub commence_time: Option<String>,
    pub completed: bool,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub scores: Option<Vec<ScoreEntry>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ScoreEntry {
    pub name: String,
    /// The API sends scores as strings; backfills sometimes use numbers.
    pub score: Option<Value>,
}

impl Bookmaker {
    /// Bookmaker id, `"unknown"` when the feed omits it.
    pub fn id(&self) -> &str {
        self.key.as_deref().unwrap_or("unknown")
    }

    /// First market of the given type. Later duplicates are ignored.
    pub fn market(&self, key: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.key == key)
    }
}

/// Per-record validation failures. Never fatal on their own.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error("expected a list of events")]
    NotAList,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unexpected record shape: {0}")]
    Shape(String),
}

/// Counts of what a loader read and what it had to drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    pub snapshots_read: usize,
    pub snapshots_skipped: usize,
    pub records_read: usize,
    pub records_skipped: usize,
}

impl LoadStats {
    pub fn skipped(&self) -> usize {
        self.snapshots_skipped + self.records_skipped
    }
}

/// Borrow the event list out of a snapshot payload.
pub fn event_list(payload: &Value) -> Result<&[Value], RecordError> {
    payload
        .as_array()
        .map(Vec::as_slice)
        .ok_or(RecordError::NotAList)
}

pub fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, RecordError> {
    T::deserialize(value).map_err(|e| RecordError::Shape(e.to_string()))
}

/// Require a present, non-blank string field.
pub fn required<'a>(
    value: &'a Option<String>,
    field: &'static str,
) -> Result<&'a str, RecordError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RecordError::MissingField(field)),
    }
}

/// Parse a goal count, either `"2"` or `2`. Negative, fractional and
/// out-of-range values are not clean scores.
pub fn parse_score(value: &Value) -> Option<u16> {
    match value {
        Value::String(s) => s.trim().parse::<u16>().ok(),
        Value::Number(n) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        _ => None,
    }
}

/// One captured payload (a file, or one API response).
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: String,
    pub captured_at: Option<NaiveDateTime>,
    pub payload: Value,
}

impl Snapshot {
    pub fn new(id: impl Into<String>, captured_at: Option<NaiveDateTime>, payload: Value) -> Self {
        Self {
            id: id.into(),
            captured_at,
            payload,
        }
    }

    /// Build a snapshot whose capture time is read from its name, e.g.
    /// `spreads_20250114_093000.json` or `pl_h2h_odds_2025-01-14.json`.
    pub fn from_name(name: impl Into<String>, payload: Value) -> Self {
        let name = name.into();
        let captured_at = capture_time_from_name(&name);
        Self::new(name, captured_at, payload)
    }

    /// Chronological order. Snapshots with no capture time (backfills) come
    /// first; ties fall back to the id.
    pub fn chronological(a: &Snapshot, b: &Snapshot) -> Ordering {
        match (a.captured_at, b.captured_at) {
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (x, y) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
        }
    }
}

pub fn capture_time_from_name(name: &str) -> Option<NaiveDateTime> {
    let windows = |len: usize| {
        (0..name.len().saturating_sub(len - 1))
            .filter(move |&i| name.is_char_boundary(i) && name.is_char_boundary(i + len))
            .map(move |i| &name[i..i + len])
    };

    let stamped = windows(15).find_map(|w| NaiveDateTime::parse_from_str(w, "%Y%m%d_%H%M%S").ok());
    if let Some(ts) = stamped {
        return Some(ts);
    }
    windows(10)
        .find_map(|w| NaiveDate::parse_from_str(w, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

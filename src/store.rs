//! Snapshot files on disk.
//!
//! Layout under the data directory:
//! - `spreads_<YYYYMMDD_HHMMSS>.json` one per spread fetch
//! - `spreads_backfill.json` historical lines from a season CSV; no
//!   timestamp, so it sorts before every fetched snapshot
//! - `pl_h2h_odds_<YYYY-MM-DD>.json` one per h2h fetch day
//! - `scores_latest.json` accumulated completed games

use crate::odds_api::Snapshot;
use crate::teams::{normalize, TeamName};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

pub const SPREAD_PREFIX: &str = "spreads_";
pub const H2H_PREFIX: &str = "pl_h2h_odds_";
pub const SCORES_FILE: &str = "scores_latest.json";
pub const BACKFILL_SPREADS_FILE: &str = "spreads_backfill.json";

/// Outcome of merging score records into `scores_latest.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreMerge {
    pub total: usize,
    pub added: usize,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub async fn read_spread_snapshots(&self) -> Result<Vec<Snapshot>> {
        self.read_snapshots(SPREAD_PREFIX).await
    }

    pub async fn read_h2h_snapshots(&self) -> Result<Vec<Snapshot>> {
        self.read_snapshots(H2H_PREFIX).await
    }

    /// All `<prefix>*.json` files in capture order.
    ///
    /// A file that is not valid JSON is kept with a null payload so the
    /// loader counts it as a skipped snapshot.
    async fn read_snapshots(&self, prefix: &str) -> Result<Vec<Snapshot>> {
        let mut entries = match fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Data directory {} does not exist", self.data_dir.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to list {}", self.data_dir.display()))
            }
        };

        let mut snapshots = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(prefix) || !name.ends_with(".json") {
                continue;
            }

            let body = fs::read_to_string(entry.path())
                .await
                .with_context(|| format!("Failed to read {}", name))?;
            let payload = match serde_json::from_str(&body) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Snapshot {} is not valid JSON: {}", name, e);
                    Value::Null
                }
            };
            snapshots.push(Snapshot::from_name(name, payload));
        }

        snapshots.sort_by(Snapshot::chronological);
        debug!("Read {} {}* snapshots", snapshots.len(), prefix);
        Ok(snapshots)
    }

    /// The accumulated scores payload. A missing file is an empty list.
    pub async fn read_results(&self) -> Result<Value> {
        let path = self.data_dir.join(SCORES_FILE);
        let body = match fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} not found; no results to analyze", path.display());
                return Ok(Value::Array(Vec::new()));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        serde_json::from_str(&body)
            .with_context(|| format!("{} is not valid JSON", path.display()))
    }

    pub async fn write_spread_snapshot(
        &self,
        payload: &Value,
        captured_at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let name = format!(
            "{}{}.json",
            SPREAD_PREFIX,
            captured_at.format("%Y%m%d_%H%M%S")
        );
        self.write_json(&name, payload).await
    }

    /// One file per day; a second fetch on the same day replaces the first.
    pub async fn write_h2h_snapshot(
        &self,
        payload: &Value,
        captured_at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let name = format!("{}{}.json", H2H_PREFIX, captured_at.format("%Y-%m-%d"));
        self.write_json(&name, payload).await
    }

    /// Replaces any earlier backfill; the CSV always carries the full season.
    pub async fn write_backfill_spreads(&self, events: &[Value]) -> Result<PathBuf> {
        let payload = Value::Array(events.to_vec());
        self.write_json(BACKFILL_SPREADS_FILE, &payload).await
    }

    /// Merge a scores fetch by event id.
    pub async fn merge_scores(&self, fetched: &Value) -> Result<ScoreMerge> {
        let fetched = fetched.as_array().map(Vec::as_slice).unwrap_or_default();
        self.update_scores(|existing| merge_score_records(existing, fetched))
            .await
    }

    /// Merge backfilled scores by fixture and day. Fixtures already on file,
    /// under any spelling of the team names, are left alone.
    pub async fn merge_backfill_scores(&self, backfill: &[Value]) -> Result<ScoreMerge> {
        self.update_scores(|existing| merge_backfill_records(existing, backfill))
            .await
    }

    async fn update_scores(
        &self,
        merge: impl FnOnce(Vec<Value>) -> (Vec<Value>, usize),
    ) -> Result<ScoreMerge> {
        let path = self.data_dir.join(SCORES_FILE);
        let existing = read_score_history(&path).await?;

        let (merged, added) = merge(existing);
        let merge = ScoreMerge {
            total: merged.len(),
            added,
        };
        self.write_json(SCORES_FILE, &Value::Array(merged)).await?;

        info!(
            "Saved {} (Total: {}, New: {})",
            path.display(),
            merge.total,
            merge.added
        );
        Ok(merge)
    }

    async fn write_json(&self, name: &str, payload: &Value) -> Result<PathBuf> {
        let path = self.data_dir.join(name);
        write_pretty(&path, payload).await?;
        Ok(path)
    }
}

/// Stored score records. Only a missing file starts a fresh history;
/// anything unreadable is an error so the file is never overwritten.
async fn read_score_history(path: &Path) -> Result<Vec<Value>> {
    let body = match fs::read_to_string(path).await {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("{} not found; starting a fresh history", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    let stored = serde_json::from_str::<Value>(&body)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    match stored {
        Value::Array(records) => Ok(records),
        _ => Err(anyhow!("{} is not a list of score records", path.display())),
    }
}

/// Write a report document, creating the output directory if needed.
pub async fn write_report<T: Serialize>(
    output_dir: &Path,
    file_name: &str,
    report: &T,
) -> Result<PathBuf> {
    let path = output_dir.join(file_name);
    write_pretty(&path, report).await?;
    info!("Wrote {}", path.display());
    Ok(path)
}

async fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Merge completed games from `fetched` into `existing`, keyed by event id.
///
/// Existing records keep their position; a fetched record with a known id
/// replaces it in place, new ids are appended. Returns the merged list and
/// the number of new ids.
pub fn merge_score_records(existing: Vec<Value>, fetched: &[Value]) -> (Vec<Value>, usize) {
    let mut merged = existing;
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (i, record) in merged.iter().enumerate() {
        if let Some(id) = record.get("id").and_then(Value::as_str) {
            positions.insert(id.to_string(), i);
        }
    }

    let mut added = 0;
    for record in fetched {
        if record.get("completed").and_then(Value::as_bool) != Some(true) {
            continue;
        }
        let Some(id) = record.get("id").and_then(Value::as_str) else {
            continue;
        };
        match positions.get(id) {
            Some(&i) => merged[i] = record.clone(),
            None => {
                positions.insert(id.to_string(), merged.len());
                merged.push(record.clone());
                added += 1;
            }
        }
    }
    (merged, added)
}

type FixtureDay = (TeamName, TeamName, String);

/// Normalized home, away and kickoff date of a score record.
fn fixture_day(record: &Value) -> Option<FixtureDay> {
    let field = |name: &str| record.get(name).and_then(Value::as_str);
    let day: String = field("commence_time")?.chars().take(10).collect();
    Some((normalize(field("home_team")?), normalize(field("away_team")?), day))
}

/// Append backfilled records whose fixture and day are not on file yet.
pub fn merge_backfill_records(existing: Vec<Value>, backfill: &[Value]) -> (Vec<Value>, usize) {
    let mut merged = existing;
    let mut seen: HashSet<FixtureDay> = merged.iter().filter_map(fixture_day).collect();

    let mut added = 0;
    for record in backfill {
        let Some(key) = fixture_day(record) else {
            continue;
        };
        if seen.insert(key) {
            merged.push(record.clone());
            added += 1;
        }
    }
    (merged, added)
}

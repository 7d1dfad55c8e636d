//! Historical backfill from football-data.co.uk season CSVs (`E0.csv`).
//!
//! Each row becomes an Odds API shaped score record and, when the row
//! carries an Asian handicap, a spread event quoted by the `backfill`
//! bookmaker. Team names are canonicalized here through the football-data
//! alias table, so the records read back like any other feed.

use crate::fetch::download_text;
use crate::odds_api::LoadStats;
use crate::teams::{DataSource, NameAudit, TeamName};
use anyhow::Context;
use chrono::NaiveDate;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const BACKFILL_BOOKMAKER: &str = "backfill";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackfillError {
    #[error("CSV has no header row")]
    Empty,
    #[error("CSV header is missing column {0}")]
    MissingColumn(&'static str),
}

#[derive(Debug, Default)]
pub struct Backfill {
    /// Completed games, `/scores` shape.
    pub scores: Vec<Value>,
    /// One spread event per row with a handicap, `/odds` shape.
    pub spreads: Vec<Value>,
    pub stats: LoadStats,
    pub audit: NameAudit,
}

struct Columns {
    date: usize,
    home: usize,
    away: usize,
    home_goals: usize,
    away_goals: usize,
    closing_handicap: Option<usize>,
    handicap: Option<usize>,
}

impl Columns {
    fn from_header(header: &[&str]) -> Result<Self, BackfillError> {
        let find = |name: &str| header.iter().position(|col| col.trim() == name);
        let need = |name: &'static str| find(name).ok_or(BackfillError::MissingColumn(name));
        Ok(Self {
            date: need("Date")?,
            home: need("HomeTeam")?,
            away: need("AwayTeam")?,
            home_goals: need("FTHG")?,
            away_goals: need("FTAG")?,
            closing_handicap: find("AHCh"),
            handicap: find("AHh"),
        })
    }
}

struct Row {
    date: NaiveDate,
    home: TeamName,
    away: TeamName,
    home_goals: u16,
    away_goals: u16,
    handicap: Option<f64>,
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Read a season CSV from a local path or an http(s) URL.
pub async fn read_source(source: &str) -> anyhow::Result<String> {
    if is_url(source) {
        return download_text(source).await;
    }
    let bytes = tokio::fs::read(source)
        .await
        .with_context(|| format!("Failed to read {}", source))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse one season CSV. Only a missing header or missing core column is an
/// error; bad rows are counted and skipped.
pub fn parse_season_csv(text: &str) -> Result<Backfill, BackfillError> {
    let mut lines = text.lines().map(|line| line.trim_end_matches('\r'));
    let header_line = lines
        .next()
        .map(|line| line.trim_start_matches('\u{feff}'))
        .filter(|line| !line.trim().is_empty())
        .ok_or(BackfillError::Empty)?;
    let header: Vec<&str> = header_line.split(',').collect();
    let columns = Columns::from_header(&header)?;

    let mut backfill = Backfill::default();
    backfill.stats.snapshots_read = 1;

    for (line_no, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |i: usize| fields.get(i).copied().unwrap_or("");
        if field(columns.date).is_empty() {
            continue;
        }
        backfill.stats.records_read += 1;

        let Some(row) = parse_row(&columns, &field, &mut backfill.audit) else {
            debug!("Skipping CSV row {}: {}", line_no + 2, line);
            backfill.stats.records_skipped += 1;
            continue;
        };
        let n = backfill.scores.len();
        if let Some(point) = row.handicap {
            backfill.spreads.push(spread_event(n, &row, point));
        }
        backfill.scores.push(score_record(n, &row));
    }

    if backfill.stats.records_skipped > 0 {
        warn!("Skipped {} unreadable CSV rows", backfill.stats.records_skipped);
    }
    info!(
        "Parsed {} historical matches ({} with handicaps)",
        backfill.scores.len(),
        backfill.spreads.len()
    );
    Ok(backfill)
}

fn parse_row<'a>(
    columns: &Columns,
    field: &impl Fn(usize) -> &'a str,
    audit: &mut NameAudit,
) -> Option<Row> {
    let date = parse_date(field(columns.date))?;
    let home_raw = Some(field(columns.home)).filter(|s| !s.is_empty())?;
    let away_raw = Some(field(columns.away)).filter(|s| !s.is_empty())?;
    let home_goals = field(columns.home_goals).parse().ok()?;
    let away_goals = field(columns.away_goals).parse().ok()?;

    // Closing line preferred over the opening one.
    let handicap = [columns.closing_handicap, columns.handicap]
        .into_iter()
        .flatten()
        .map(field)
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok());

    Some(Row {
        date,
        home: audit.resolve(DataSource::FootballData, home_raw),
        away: audit.resolve(DataSource::FootballData, away_raw),
        home_goals,
        away_goals,
        handicap,
    })
}

/// `DD/MM/YYYY`, or `DD/MM/YY` in older seasons.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let year_digits = raw.rsplit('/').next().map(str::len)?;
    let format = if year_digits == 2 { "%d/%m/%y" } else { "%d/%m/%Y" };
    NaiveDate::parse_from_str(raw, format).ok()
}

fn commence_time(date: NaiveDate) -> String {
    format!("{}T00:00:00Z", date.format("%Y-%m-%d"))
}

fn score_record(n: usize, row: &Row) -> Value {
    let commence = commence_time(row.date);
    json!({
        "id": format!("backfill_{}", n),
        "sport_key": "soccer_epl",
        "commence_time": commence,
        "completed": true,
        "home_team": row.home,
        "away_team": row.away,
        "scores": [
            {"name": row.home, "score": row.home_goals.to_string()},
            {"name": row.away, "score": row.away_goals.to_string()}
        ],
        "last_update": commence
    })
}

fn spread_event(n: usize, row: &Row, point: f64) -> Value {
    json!({
        "id": format!("backfill_spread_{}", n),
        "sport_key": "soccer_epl",
        "commence_time": commence_time(row.date),
        "home_team": row.home,
        "away_team": row.away,
        "bookmakers": [{
            "key": BACKFILL_BOOKMAKER,
            "title": "Backfill",
            "markets": [{
                "key": "spreads",
                "outcomes": [
                    {"name": row.home, "point": point},
                    {"name": row.away, "point": -point}
                ]
            }]
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Div,Date,Time,HomeTeam,AwayTeam,FTHG,FTAG,FTR,AHh,AHCh";

    fn csv(rows: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn rows_become_scores_and_spreads() {
        let backfill = parse_season_csv(&csv(&[
            "E0,16/08/2025,20:00,Liverpool,Bournemouth,4,2,H,-1.5,-1.25",
            "E0,17/08/2025,14:00,Nott'm Forest,Brentford,3,1,H,-0.25,",
        ]))
        .unwrap();

        assert_eq!(backfill.scores.len(), 2);
        assert_eq!(backfill.spreads.len(), 2);
        let score = &backfill.scores[0];
        assert_eq!(score["commence_time"], "2025-08-16T00:00:00Z");
        assert_eq!(score["scores"][0]["score"], "4");

        let spread = &backfill.spreads[0];
        assert_eq!(spread["bookmakers"][0]["key"], "backfill");
        // closing line wins over the opening one
        let outcomes = &spread["bookmakers"][0]["markets"][0]["outcomes"];
        assert_eq!(outcomes[0]["point"], -1.25);
        assert_eq!(outcomes[1]["point"], 1.25);
        // falls back to the opening line when the closing one is blank
        let outcomes = &backfill.spreads[1]["bookmakers"][0]["markets"][0]["outcomes"];
        assert_eq!(outcomes[0]["point"], -0.25);
    }

    #[test]
    fn names_go_through_the_football_data_table() {
        let backfill = parse_season_csv(&csv(&[
            "E0,18/08/2025,20:00,Leicester,Nottingham,1,1,D,0,0",
        ]))
        .unwrap();
        assert_eq!(backfill.scores[0]["home_team"], "Leicester City");
        assert_eq!(backfill.scores[0]["away_team"], "Nott'm Forest");
        assert!(backfill.audit.unrecognized().is_empty());
    }

    #[test]
    fn rows_without_handicap_keep_their_score() {
        let text = "Date,HomeTeam,AwayTeam,FTHG,FTAG\n23/08/2025,Arsenal,Leeds,5,0";
        let backfill = parse_season_csv(text).unwrap();
        assert_eq!(backfill.scores.len(), 1);
        assert!(backfill.spreads.is_empty());
    }

    #[test]
    fn bad_rows_are_counted_and_blank_rows_ignored() {
        let backfill = parse_season_csv(&csv(&[
            "E0,2025-08-16,20:00,Arsenal,Chelsea,1,0,H,-0.5,-0.5",
            "E0,16/08/2025,20:00,Arsenal,Chelsea,-1,0,H,-0.5,-0.5",
            ",,,,,,,,,",
            "E0,16/08/25,15:00,Fulham,Everton,2,2,D,0.25,0.25",
        ]))
        .unwrap();
        assert_eq!(backfill.scores.len(), 1);
        assert_eq!(backfill.scores[0]["commence_time"], "2025-08-16T00:00:00Z");
        assert_eq!(backfill.stats.records_read, 3);
        assert_eq!(backfill.stats.records_skipped, 2);
    }

    #[test]
    fn sources_are_paths_or_urls() {
        assert!(is_url("https://www.football-data.co.uk/mmz4281/2526/E0.csv"));
        assert!(!is_url("data/E0.csv"));
        assert!(tokio_test::block_on(read_source("/nonexistent/E0.csv")).is_err());
    }

    #[test]
    fn missing_columns_are_fatal() {
        assert_eq!(parse_season_csv("").err(), Some(BackfillError::Empty));
        assert_eq!(
            parse_season_csv("Date,HomeTeam,AwayTeam,FTHG\n").err(),
            Some(BackfillError::MissingColumn("FTAG"))
        );
    }
}

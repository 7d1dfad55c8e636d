//! Canonical team identity.
//!
//! Every data source spells clubs differently ("Manchester United",
//! "Man United", "Man Utd"). All names are folded into one canonical
//! [`TeamName`] before they are used as a join key anywhere in the crate.
//! Names we have never seen pass through unchanged so a promoted club does
//! not break the pipeline, but they are recorded by [`NameAudit`].

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Canonical clubs (2025-26 season plus recent relegations).
pub const CANONICAL_TEAMS: &[&str] = &[
    "Arsenal",
    "Aston Villa",
    "Bournemouth",
    "Brentford",
    "Brighton",
    "Burnley",
    "Chelsea",
    "Crystal Palace",
    "Everton",
    "Fulham",
    "Ipswich Town",
    "Leeds",
    "Leicester City",
    "Liverpool",
    "Man City",
    "Man United",
    "Newcastle",
    "Nott'm Forest",
    "Southampton",
    "Sunderland",
    "Tottenham",
    "West Ham",
    "Wolves",
];

/// Canonical team identifier. Only constructed through normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TeamName(String);

impl TeamName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// External providers with their own abbreviation habits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// The Odds API (`/odds`, `/scores`).
    OddsApi,
    /// football-data.co.uk season CSVs, used for historical backfill.
    FootballData,
}

impl DataSource {
    pub const ALL: [DataSource; 2] = [DataSource::OddsApi, DataSource::FootballData];

    fn alias(self, name: &str) -> Option<&'static str> {
        match self {
            DataSource::OddsApi => odds_api_alias(name),
            DataSource::FootballData => football_data_alias(name),
        }
    }
}

/// Outcome of a lookup: the canonical name and whether it is a club we know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub name: TeamName,
    pub known: bool,
}

/// Normalize a raw team name to its canonical form.
pub fn normalize(raw: &str) -> TeamName {
    resolve(raw).name
}

/// Normalize using `source`'s alias table before the shared tables.
pub fn normalize_from(source: DataSource, raw: &str) -> TeamName {
    resolve_from(source, raw).name
}

/// Resolve a name of unknown origin: every feed's table is consulted.
pub fn resolve(raw: &str) -> Resolution {
    let cleaned = clean(raw);
    let alias = DataSource::ALL
        .into_iter()
        .find_map(|source| source.alias(&cleaned));
    lookup(cleaned, alias)
}

/// Resolve a name from one feed: only that feed's table and the shared one.
pub fn resolve_from(source: DataSource, raw: &str) -> Resolution {
    let cleaned = clean(raw);
    let alias = source.alias(&cleaned);
    lookup(cleaned, alias)
}

fn lookup(cleaned: String, source_alias: Option<&'static str>) -> Resolution {
    if let Some(canonical) = source_alias.or_else(|| shared_alias(&cleaned)) {
        return known(canonical);
    }
    let is_known = is_canonical(&cleaned);
    Resolution {
        name: TeamName(cleaned),
        known: is_known,
    }
}

pub fn is_canonical(name: &str) -> bool {
    CANONICAL_TEAMS.contains(&name)
}

fn known(canonical: &str) -> Resolution {
    Resolution {
        name: TeamName(canonical.to_string()),
        known: true,
    }
}

/// Straighten curly quotes and collapse whitespace. Nothing else is
/// rewritten; lookups stay exact.
fn clean(name: &str) -> String {
    let straightened: String = name
        .chars()
        .map(|ch| match ch {
            '\u{2019}' | '\u{2018}' => '\'',
            _ => ch,
        })
        .collect();
    straightened.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn shared_alias(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "Brighton and Hove Albion" | "Brighton & Hove Albion" => "Brighton",
        "Leeds United" => "Leeds",
        "Manchester City" => "Man City",
        "Manchester United" => "Man United",
        "Newcastle United" => "Newcastle",
        "Nottingham Forest" => "Nott'm Forest",
        "Tottenham Hotspur" => "Tottenham",
        "West Ham United" => "West Ham",
        "Wolverhampton Wanderers" => "Wolves",
        _ => return None,
    };
    Some(canonical)
}

fn odds_api_alias(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "AFC Bournemouth" => "Bournemouth",
        "Manchester United FC" | "Man Utd" => "Man United",
        "Manchester City FC" => "Man City",
        "Tottenham Hotspur FC" | "Spurs" => "Tottenham",
        "Ipswich" => "Ipswich Town",
        _ => return None,
    };
    Some(canonical)
}

fn football_data_alias(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "Leicester" => "Leicester City",
        "Ipswich" => "Ipswich Town",
        "Nottingham" => "Nott'm Forest",
        "Newcastle Utd" => "Newcastle",
        _ => return None,
    };
    Some(canonical)
}

/// Collects raw spellings that did not resolve to a known club.
#[derive(Debug, Default, Clone)]
pub struct NameAudit {
    unrecognized: BTreeSet<String>,
}

impl NameAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `raw` for `source`, remembering it if the club is unknown.
    pub fn resolve(&mut self, source: DataSource, raw: &str) -> TeamName {
        let resolution = resolve_from(source, raw);
        if !resolution.known {
            self.unrecognized.insert(raw.trim().to_string());
        }
        resolution.name
    }

    pub fn unrecognized(&self) -> &BTreeSet<String> {
        &self.unrecognized
    }

    pub fn merge(&mut self, other: NameAudit) {
        self.unrecognized.extend(other.unrecognized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_full_names_to_canonical() {
        assert_eq!(normalize("Manchester United").as_str(), "Man United");
        assert_eq!(normalize("Nottingham Forest").as_str(), "Nott'm Forest");
        assert_eq!(normalize("Wolverhampton Wanderers").as_str(), "Wolves");
    }

    #[test]
    fn canonical_names_are_fixed_points() {
        for name in CANONICAL_TEAMS {
            assert_eq!(normalize(name).as_str(), *name);
        }
    }

    #[test]
    fn every_alias_lands_on_a_canonical_team() {
        for raw in ["Spurs", "Man Utd", "AFC Bournemouth", "Leicester", "Brighton & Hove Albion"] {
            let resolution = resolve(raw);
            assert!(resolution.known, "{raw} should resolve");
            assert!(is_canonical(resolution.name.as_str()));
        }
    }

    #[test]
    fn source_table_takes_priority() {
        assert_eq!(
            normalize_from(DataSource::FootballData, "Ipswich").as_str(),
            "Ipswich Town"
        );
        assert_eq!(
            normalize_from(DataSource::OddsApi, "Tottenham Hotspur").as_str(),
            "Tottenham"
        );
    }

    #[test]
    fn source_tables_do_not_leak_into_other_feeds() {
        assert!(resolve_from(DataSource::FootballData, "Nottingham").known);
        let odds_api = resolve_from(DataSource::OddsApi, "Nottingham");
        assert!(!odds_api.known);
        assert_eq!(odds_api.name.as_str(), "Nottingham");

        assert!(resolve_from(DataSource::OddsApi, "Spurs").known);
        assert!(!resolve_from(DataSource::FootballData, "Spurs").known);
        // shared spellings work for every feed
        assert!(resolve_from(DataSource::FootballData, "Manchester City").known);
    }

    #[test]
    fn cleans_quotes_and_whitespace() {
        assert_eq!(normalize("  Nott\u{2019}m   Forest ").as_str(), "Nott'm Forest");
    }

    #[test]
    fn unknown_names_pass_through_and_are_audited() {
        let mut audit = NameAudit::new();
        let name = audit.resolve(DataSource::OddsApi, "Sheffield Wednesday");
        assert_eq!(name.as_str(), "Sheffield Wednesday");
        audit.resolve(DataSource::OddsApi, "Arsenal");
        assert_eq!(audit.unrecognized().len(), 1);
        assert!(audit.unrecognized().contains("Sheffield Wednesday"));
    }
}

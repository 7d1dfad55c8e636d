//! Fixture identity shared by spread and result data.

use crate::teams::TeamName;
use serde::Serialize;
use std::fmt;

/// Join key between spread snapshots and results. `commence_time` is the
/// ISO-8601 string exactly as the feed sent it; two sources only join when
/// the strings are identical.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchKey {
    pub home: TeamName,
    pub away: TeamName,
    pub commence_time: String,
}

impl MatchKey {
    pub fn new(home: TeamName, away: TeamName, commence_time: impl Into<String>) -> Self {
        Self {
            home,
            away,
            commence_time: commence_time.into(),
        }
    }

    /// Calendar date (`YYYY-MM-DD`) of kickoff, `"Unknown"` if the time is
    /// too short to carry one.
    pub fn date(&self) -> String {
        self.commence_time
            .get(..10)
            .map(str::to_string)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn same_matchup(&self, home: &TeamName, away: &TeamName) -> bool {
        &self.home == home && &self.away == away
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v {} @ {}", self.home, self.away, self.commence_time)
    }
}

use assert_float_eq::*;
use chrono::{DateTime, Utc};
use epl_spread_tracker::aggregate::TeamAggregate;
use epl_spread_tracker::backfill::parse_season_csv;
use epl_spread_tracker::consensus::SpreadMatch;
use epl_spread_tracker::odds_api::Snapshot;
use epl_spread_tracker::report::TeamReport;
use epl_spread_tracker::{PipelineContext, PipelineError, PipelineInput};
use serde_json::{json, Value};

const KICKOFF: &str = "2025-01-14T19:30:00Z";

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-02-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn spread_event(home: &str, away: &str, commence: &str, books: &[(&str, f64)]) -> Value {
    let bookmakers: Vec<Value> = books
        .iter()
        .map(|(key, point)| {
            json!({
                "key": key,
                "title": key,
                "markets": [{
                    "key": "spreads",
                    "outcomes": [
                        {"name": home, "price": 1.9, "point": point},
                        {"name": away, "price": 1.9, "point": -point}
                    ]
                }]
            })
        })
        .collect();
    json!({
        "id": format!("{}-{}", home, away),
        "sport_key": "soccer_epl",
        "commence_time": commence,
        "home_team": home,
        "away_team": away,
        "bookmakers": bookmakers
    })
}

fn score(id: &str, home: &str, away: &str, commence: &str, goals: (i32, i32)) -> Value {
    json!({
        "id": id,
        "sport_key": "soccer_epl",
        "commence_time": commence,
        "completed": true,
        "home_team": home,
        "away_team": away,
        "scores": [
            {"name": home, "score": goals.0.to_string()},
            {"name": away, "score": goals.1.to_string()}
        ]
    })
}

fn h2h_event(id: &str, home: &str, away: &str, commence: &str, prices: (f64, f64, f64)) -> Value {
    json!({
        "id": id,
        "commence_time": commence,
        "home_team": home,
        "away_team": away,
        "bookmakers": [{
            "key": "draftkings",
            "title": "DraftKings",
            "last_update": "2025-02-01T09:00:00Z",
            "markets": [{
                "key": "h2h",
                "outcomes": [
                    {"name": home, "price": prices.0},
                    {"name": "Draw", "price": prices.1},
                    {"name": away, "price": prices.2}
                ]
            }]
        }]
    })
}

fn run(spreads: Vec<Snapshot>, results: Value, h2h: Vec<Snapshot>) -> PipelineContext {
    PipelineContext::build(&PipelineInput {
        spread_snapshots: spreads,
        results,
        h2h_snapshots: h2h,
        now: now(),
    })
    .unwrap()
}

fn team<'a>(report: &'a TeamReport, name: &str) -> &'a TeamAggregate {
    report
        .teams
        .iter()
        .find(|t| t.name.as_str() == name)
        .unwrap_or_else(|| panic!("{} missing from report", name))
}

#[test]
fn home_favourite_covering_scores_positive_and_away_mirrors() {
    let spreads = vec![Snapshot::from_name(
        "spreads_20250113_090000.json",
        json!([spread_event("Arsenal", "Chelsea", KICKOFF, &[("bet365", -1.5)])]),
    )];
    let results = json!([score("g1", "Arsenal", "Chelsea", KICKOFF, (3, 0))]);
    let report = run(spreads, results, Vec::new()).team_report();

    assert_eq!(report.matches_analyzed, 1);
    assert_eq!(report.teams_tracked, 2);
    assert_eq!(report.teams[0].name.as_str(), "Arsenal");

    let arsenal = team(&report, "Arsenal");
    let chelsea = team(&report, "Chelsea");
    assert_float_absolute_eq!(arsenal.total_net_performance, 1.5, 1e-9);
    assert_float_absolute_eq!(chelsea.total_net_performance, -1.5, 1e-9);
    assert_eq!(arsenal.statistics.covers, 1);
    assert_eq!(chelsea.statistics.covers, 0);
    assert_eq!(chelsea.match_history[0].score, "0-3");
    assert_eq!(report.bookmakers, vec!["bet365".to_string()]);
}

#[test]
fn match_without_spread_counts_but_enters_no_history() {
    let spreads = vec![Snapshot::from_name(
        "spreads_20250113_090000.json",
        json!([spread_event("Arsenal", "Chelsea", KICKOFF, &[("bet365", -0.5)])]),
    )];
    let results = json!([
        score("g1", "Arsenal", "Chelsea", KICKOFF, (1, 1)),
        score("g2", "Everton", "Fulham", "2025-01-15T20:00:00Z", (2, 0))
    ]);
    let report = run(spreads, results, Vec::new()).team_report();

    assert_eq!(report.total_matches, 2);
    assert_eq!(report.matches_analyzed, 1);
    assert!(report.teams.iter().all(|t| t.name.as_str() != "Everton"));
    assert!(report
        .teams
        .iter()
        .flat_map(|t| &t.match_history)
        .all(|m| m.opponent.as_str() != "Everton" && m.opponent.as_str() != "Fulham"));
}

#[test]
fn net_performance_is_zero_sum_across_the_league() {
    let spreads = vec![Snapshot::from_name(
        "spreads_20250113_090000.json",
        json!([
            spread_event(
                "Arsenal",
                "Chelsea",
                KICKOFF,
                &[("bet365", -1.0), ("williamhill", -0.75)]
            ),
            spread_event("Liverpool", "Wolves", "2025-01-18T15:00:00Z", &[("bet365", -2.25)]),
            spread_event("Fulham", "Brentford", "2025-01-19T14:00:00Z", &[("bet365", 0.25)])
        ]),
    )];
    let results = json!([
        score("g1", "Arsenal", "Chelsea", KICKOFF, (0, 2)),
        score("g2", "Liverpool", "Wolves", "2025-01-18T15:00:00Z", (4, 1)),
        score("g3", "Fulham", "Brentford", "2025-01-19T14:00:00Z", (1, 1))
    ]);
    let report = run(spreads, results, Vec::new()).team_report();

    let total: f64 = report.teams.iter().map(|t| t.total_net_performance).sum();
    assert_float_absolute_eq!(total, 0.0, 1e-9);
    assert_eq!(report.teams_tracked, 6);
    assert!(report.correlation.is_some());
    assert_eq!(report.correlation_samples, 3);
}

#[test]
fn later_snapshot_replaces_earlier_line() {
    let early = Snapshot::from_name(
        "spreads_20250112_090000.json",
        json!([spread_event("Arsenal", "Chelsea", KICKOFF, &[("bet365", -1.0)])]),
    );
    let late = Snapshot::from_name(
        "spreads_20250114_090000.json",
        json!([spread_event("Arsenal", "Chelsea", KICKOFF, &[("bet365", -1.5)])]),
    );
    let results = json!([score("g1", "Arsenal", "Chelsea", KICKOFF, (3, 0))]);
    let report = run(vec![early, late], results, Vec::new()).team_report();

    let arsenal = team(&report, "Arsenal");
    assert_float_absolute_eq!(arsenal.match_history[0].spread, -1.5, 1e-9);
    assert_float_absolute_eq!(arsenal.total_net_performance, 1.5, 1e-9);
}

#[test]
fn single_match_leaves_correlation_undefined() {
    let spreads = vec![Snapshot::from_name(
        "spreads_20250113_090000.json",
        json!([spread_event("Arsenal", "Chelsea", KICKOFF, &[("bet365", -1.5)])]),
    )];
    let results = json!([score("g1", "Arsenal", "Chelsea", KICKOFF, (3, 0))]);
    let report = run(spreads, results, Vec::new()).team_report();

    assert!(report.correlation.is_none());
    assert_eq!(report.correlation_result().samples(), 1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["correlation"], Value::Null);
    assert_eq!(json["correlationSamples"], 1);
}

#[test]
fn kickoff_mismatch_falls_back_to_matchup() {
    let spreads = vec![Snapshot::from_name(
        "spreads_20250113_090000.json",
        json!([spread_event("Arsenal", "Chelsea", "2025-01-14T20:00:00Z", &[("bet365", -1.5)])]),
    )];
    let results = json!([score("g1", "Arsenal", "Chelsea", KICKOFF, (3, 0))]);
    let context = run(spreads, results, Vec::new());
    let report = context.team_report();

    assert_eq!(report.matches_analyzed, 1);
    assert_eq!(report.matchup_fallbacks, 1);
}

#[test]
fn unrecognized_names_are_reported() {
    let results = json!([score("g1", "Arsenal", "Real Madrid", KICKOFF, (1, 0))]);
    let report = run(Vec::new(), results, Vec::new()).team_report();

    assert_eq!(report.unrecognized_teams, vec!["Real Madrid".to_string()]);
    assert_eq!(report.matches_analyzed, 0);
}

#[test]
fn aliases_from_both_feeds_join_on_one_fixture() {
    let spreads = vec![Snapshot::from_name(
        "spreads_20250113_090000.json",
        json!([spread_event(
            "Manchester United",
            "Tottenham Hotspur",
            KICKOFF,
            &[("bet365", 0.5)]
        )]),
    )];
    let results = json!([score("g1", "Man Utd", "Spurs", KICKOFF, (2, 2))]);
    let report = run(spreads, results, Vec::new()).team_report();

    assert_eq!(report.matches_analyzed, 1);
    assert!(report.unrecognized_teams.is_empty());
    assert_float_absolute_eq!(team(&report, "Man United").total_net_performance, 0.5, 1e-9);
}

#[test]
fn report_json_uses_rounded_camel_case_fields() {
    let spreads = vec![Snapshot::from_name(
        "spreads_20250113_090000.json",
        json!([spread_event(
            "Arsenal",
            "Chelsea",
            KICKOFF,
            &[("bet365", -1.0), ("skybet", -0.5), ("williamhill", -0.5)]
        )]),
    )];
    let results = json!([score("g1", "Arsenal", "Chelsea", KICKOFF, (2, 0))]);
    let report = run(spreads, results, Vec::new()).team_report();
    let json = serde_json::to_value(&report).unwrap();

    let arsenal = &json["teams"][0];
    assert_eq!(arsenal["name"], "Arsenal");
    assert_eq!(arsenal["totalNetPerformance"], 1.33);
    assert_eq!(arsenal["matchHistory"][0]["homeAway"], "home");
    assert_eq!(arsenal["matchHistory"][0]["spread"], -0.67);
    assert_eq!(arsenal["matchHistory"][0]["result"], "W");
    assert_eq!(arsenal["matchHistory"][0]["netPerformanceByBookmaker"]["williamhill"], 1.5);
    assert_eq!(arsenal["statistics"]["winRate"], 1.0);
}

#[test]
fn upcoming_report_merges_h2h_with_spreads() {
    let future = "2025-02-05T20:00:00Z";
    let spreads = vec![Snapshot::from_name(
        "spreads_20250201_090000.json",
        json!([spread_event("Liverpool", "Everton", future, &[("bet365", -1.25)])]),
    )];
    let h2h = vec![Snapshot::from_name(
        "pl_h2h_odds_2025-02-01.json",
        json!([
            h2h_event("e1", "Liverpool", "Everton", future, (1.5, 4.5, 6.0)),
            h2h_event("e0", "Arsenal", "Chelsea", "2025-01-20T20:00:00Z", (2.0, 3.4, 3.8)),
            h2h_event("e2", "Fulham", "Brentford", "2025-02-03T15:00:00Z", (2.5, 3.3, 2.9))
        ]),
    )];
    let report = run(spreads, json!([]), h2h).upcoming_report();

    assert_eq!(report.total_matches, 2);
    assert_eq!(report.upcoming_matches[0].id, "e2");
    assert!(report.upcoming_matches[0].spread.is_none());

    let liverpool = &report.upcoming_matches[1];
    assert_eq!(liverpool.h2h_odds.bookmaker, "DraftKings");
    assert_float_absolute_eq!(liverpool.h2h_odds.implied_prob_home, 1.0 / 1.5, 1e-9);
    let spread = liverpool.spread.as_ref().unwrap();
    assert_eq!(spread.matched_by, SpreadMatch::Exact);
    // quarter line snapped to the half-goal line
    assert_float_absolute_eq!(spread.home_point, -1.5, 1e-9);
    assert_float_absolute_eq!(spread.away_point, 1.5, 1e-9);
    assert_eq!(report.bookmakers, vec!["bet365".to_string()]);
}

#[test]
fn impossible_scores_are_skipped_not_fatal() {
    let spreads = vec![Snapshot::from_name(
        "spreads_20250113_090000.json",
        json!([
            spread_event("Arsenal", "Chelsea", KICKOFF, &[("bet365", -0.5)]),
            spread_event("Everton", "Fulham", "2025-01-15T20:00:00Z", &[("bet365", 0.5)])
        ]),
    )];
    let mut huge = score("g2", "Everton", "Fulham", "2025-01-15T20:00:00Z", (0, 0));
    huge["scores"][0]["score"] = json!("2147483647");
    huge["scores"][1]["score"] = json!("-1");
    let results = json!([score("g1", "Arsenal", "Chelsea", KICKOFF, (1, 0)), huge]);
    let report = run(spreads, results, Vec::new()).team_report();

    assert_eq!(report.matches_analyzed, 1);
    assert_eq!(report.skipped.unscored_results, 1);
    assert!(report.teams.iter().all(|t| t.name.as_str() != "Everton"));
}

#[test]
fn backfilled_season_flows_through_the_analysis() {
    let season = parse_season_csv(
        "Div,Date,HomeTeam,AwayTeam,FTHG,FTAG,AHh,AHCh\n\
         E0,16/08/2025,Arsenal,Chelsea,3,0,-0.5,-1.0\n\
         E0,17/08/2025,Man United,Tottenham,1,1,,",
    )
    .unwrap();
    let spreads = vec![Snapshot::from_name(
        "spreads_backfill.json",
        Value::Array(season.spreads),
    )];
    let report = run(spreads, Value::Array(season.scores), Vec::new()).team_report();

    assert_eq!(report.total_matches, 2);
    assert_eq!(report.matches_analyzed, 1);
    assert_eq!(report.bookmakers, vec!["backfill".to_string()]);
    let arsenal = team(&report, "Arsenal");
    assert_float_absolute_eq!(arsenal.total_net_performance, 2.0, 1e-9);
    assert!(report.unrecognized_teams.is_empty());
}

#[test]
fn structural_failures_are_terminal() {
    let err = PipelineContext::build(&PipelineInput {
        spread_snapshots: Vec::new(),
        results: json!({"message": "Invalid API key"}),
        h2h_snapshots: Vec::new(),
        now: now(),
    })
    .err();
    assert!(matches!(err, Some(PipelineError::MalformedResults(_))));

    let err = PipelineContext::build(&PipelineInput {
        spread_snapshots: vec![Snapshot::from_name("spreads_20250101_000000.json", Value::Null)],
        results: json!([{"completed": true}]),
        h2h_snapshots: Vec::new(),
        now: now(),
    })
    .err();
    assert!(matches!(
        err,
        Some(PipelineError::NoUsableInput {
            snapshots_skipped: 1,
            records_skipped: 1
        })
    ));
}

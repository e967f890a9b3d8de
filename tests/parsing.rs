use std::fs;
use std::path::PathBuf;

use fpl_insights::error::FetchError;
use fpl_insights::fpl_fetch::{
    merge_standings_pages, parse_bootstrap_json, parse_fixtures_json, parse_history_json,
    parse_picks_json, parse_standings_json,
};
use fpl_insights::model::{Chip, PlayerStatus, Position};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_bootstrap_fixture() {
    let raw = read_fixture("bootstrap_small.json");
    let snapshot = parse_bootstrap_json(&raw).expect("fixture should parse");
    assert_eq!(snapshot.players.len(), 6);
    assert_eq!(snapshot.teams.len(), 3);
    assert_eq!(snapshot.gameweeks.len(), 3);

    let saka = &snapshot.players[1];
    assert_eq!(saka.web_name, "Saka");
    assert_eq!(saka.position(), Some(Position::Midfielder));
    assert_eq!(saka.status, PlayerStatus::Doubtful);
    assert_eq!(saka.chance_of_playing_next_round, Some(75));
    assert_eq!(saka.form, "9.5");

    let loanee = &snapshot.players[5];
    assert!(loanee.web_name.is_empty());
    assert!(loanee.form.is_empty());
    assert_eq!(loanee.status, PlayerStatus::Unknown);
}

#[test]
fn bootstrap_null_is_an_error() {
    let err = parse_bootstrap_json("null").expect_err("null body");
    assert!(matches!(err, FetchError::Empty(_)));
    assert!(parse_bootstrap_json("{ not json").is_err());
}

#[test]
fn parses_fixtures_including_unscheduled() {
    let raw = read_fixture("fixtures_small.json");
    let fixtures = parse_fixtures_json(&raw).expect("fixture should parse");
    assert_eq!(fixtures.len(), 5);
    assert_eq!(fixtures[0].gameweek, Some(2));
    assert_eq!(fixtures[4].gameweek, None);
    assert!(fixtures[4].kickoff_time.is_empty());
    assert_eq!(fixtures[3].team_h_score, Some(2));
    assert!(fixtures[0].kickoff().is_some());
}

#[test]
fn null_fixtures_read_as_empty() {
    assert!(parse_fixtures_json("null").expect("null ok").is_empty());
    assert!(parse_fixtures_json("  ").expect("blank ok").is_empty());
}

#[test]
fn parses_picks_with_active_chip() {
    let raw = read_fixture("picks.json");
    let squad = parse_picks_json(&raw).expect("fixture should parse");
    assert_eq!(squad.picks.len(), 4);
    assert_eq!(squad.active_chip, Some(Chip::TripleCaptain));
    assert_eq!(squad.captain(), Some(2));
    assert_eq!(squad.vice_captain(), Some(3));
    let bench = squad.pick_for(4).expect("bench pick");
    assert!(!bench.is_starting());
    assert_eq!(bench.multiplier, 0);
}

#[test]
fn history_skips_unknown_chip_names() {
    let raw = read_fixture("history.json");
    let history = parse_history_json(&raw).expect("fixture should parse");
    assert_eq!(history.current.len(), 2);
    assert_eq!(history.current[1].event_transfers_cost, 4);
    let chips = history.chip_usages();
    assert_eq!(chips.len(), 1);
    assert_eq!(chips[0].chip, Chip::Wildcard);
    assert_eq!(chips[0].gameweek, 2);
}

#[test]
fn parses_standings_page() {
    let raw = read_fixture("standings.json");
    let page = parse_standings_json(&raw).expect("fixture should parse");
    assert_eq!(page.league_name, "Office League");
    assert!(page.has_next);
    assert_eq!(page.results.len(), 3);
    assert_eq!(page.results[0].manager_id, 501);
    assert_eq!(page.results[0].total_points, 152);
    assert!(page.results[2].entry_name.is_empty());
}

#[test]
fn merged_standings_list_each_manager_once() {
    let first = parse_standings_json(&read_fixture("standings.json")).expect("page 1");
    // Manager 501 dropped to 5th between the two page fetches.
    let second = parse_standings_json(
        r#"{"standings": {"has_next": false, "page": 2, "results": [
            {"entry": 504, "entry_name": "Late Show", "player_name": "Ria Moss", "rank": 4, "total": 130, "event_total": 55},
            {"entry": 501, "entry_name": "Top Bins", "player_name": "Sam Cole", "rank": 5, "total": 128, "event_total": 80}
        ]}}"#,
    )
    .expect("page 2");

    let merged = merge_standings_pages([first.results, second.results]);
    let ids: Vec<u64> = merged.iter().map(|s| s.manager_id).collect();
    assert_eq!(ids, vec![501, 502, 503, 504]);
    assert_eq!(merged[0].rank, 1);
}

#[test]
fn standings_null_is_an_error() {
    assert!(matches!(
        parse_standings_json("null"),
        Err(FetchError::Empty(_))
    ));
}

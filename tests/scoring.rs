use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use fpl_insights::captain::{CaptainTag, score_captain_options};
use fpl_insights::enrich::{EnrichedPlayer, build_team_map, enrich_players};
use fpl_insights::fpl_fetch::{parse_bootstrap_json, parse_fixtures_json};
use fpl_insights::model::{BootstrapSnapshot, Fixture, FixtureSide, Position};
use fpl_insights::predict::{
    Confidence, TransferQuery, difficulty_multiplier, fixture_score, predict_points,
    score_transfer_targets,
};
use fpl_insights::price_change::{
    PriceChangeBand, PriceDirection, change_probability, predict_price_changes,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn load() -> (BootstrapSnapshot, Vec<EnrichedPlayer>, Vec<Fixture>) {
    let snapshot =
        parse_bootstrap_json(&read_fixture("bootstrap_small.json")).expect("bootstrap parses");
    let players = enrich_players(&snapshot);
    let fixtures = parse_fixtures_json(&read_fixture("fixtures_small.json")).expect("fixtures parse");
    (snapshot, players, fixtures)
}

fn side(difficulty: u8) -> FixtureSide {
    FixtureSide {
        opponent_id: 1,
        difficulty,
        is_home: false,
    }
}

#[test]
fn harder_fixtures_never_score_higher() {
    for d in 1..5u8 {
        assert!(difficulty_multiplier(d) > difficulty_multiplier(d + 1));
        assert!(fixture_score(&[side(d)]) >= fixture_score(&[side(d + 1)]));
    }
    assert_eq!(fixture_score(&[]), 0.0);
    assert_eq!(fixture_score(&[side(1)]), 10.0);
}

#[test]
fn better_form_predicts_more_points() {
    let (_, players, fixtures) = load();
    let base = players.iter().find(|p| p.id == 3).expect("mbeumo").clone();
    let mut hot = base.clone();
    hot.id = 99;
    hot.form = base.form + 3.0;

    let predictions = predict_points(&[base, hot], &fixtures, 3);
    let cold_pts = predictions.iter().find(|p| p.player_id == 3).expect("cold");
    let hot_pts = predictions.iter().find(|p| p.player_id == 99).expect("hot");
    assert!(hot_pts.predicted_points > cold_pts.predicted_points);
    assert_eq!(predictions[0].player_id, 99);
}

/// Gameweek 10: team 1 hosts team 2, FDR 2 for the hosts and 5 for the visitors.
fn lopsided_fixture() -> Vec<Fixture> {
    vec![Fixture {
        id: 100,
        gameweek: Some(10),
        team_h: 1,
        team_a: 2,
        team_h_difficulty: 2,
        team_a_difficulty: 5,
        finished: false,
        team_h_score: None,
        team_a_score: None,
        kickoff_time: "2025-11-01T15:00:00Z".to_string(),
    }]
}

/// Mbeumo cloned onto the easy (team 1) and hard (team 2) side.
fn twins(players: &[EnrichedPlayer]) -> (EnrichedPlayer, EnrichedPlayer) {
    let base = players.iter().find(|p| p.id == 3).expect("mbeumo");
    let mut easy = base.clone();
    easy.id = 91;
    easy.team_id = 1;
    let mut hard = base.clone();
    hard.id = 92;
    hard.team_id = 2;
    (easy, hard)
}

#[test]
fn easier_opponent_predicts_more_points() {
    let (_, players, _) = load();
    let (easy, hard) = twins(&players);

    let predictions = predict_points(&[hard, easy], &lopsided_fixture(), 10);
    let easy_pts = predictions.iter().find(|p| p.player_id == 91).expect("easy");
    let hard_pts = predictions.iter().find(|p| p.player_id == 92).expect("hard");
    assert_eq!(easy_pts.form_score, hard_pts.form_score);
    assert!(easy_pts.predicted_points > hard_pts.predicted_points);
    assert!(easy_pts.fixture_score > hard_pts.fixture_score);
}

#[test]
fn transfer_score_follows_form_and_fixtures() {
    let (_, players, _) = load();
    let (easy, hard) = twins(&players);
    let mut hot = easy.clone();
    hot.id = 93;
    hot.form = easy.form + 3.0;

    let query = TransferQuery {
        start_gameweek: 10,
        horizon: 1,
        ..TransferQuery::default()
    };
    let targets = score_transfer_targets(&[easy, hard, hot], &lopsided_fixture(), &query);
    let score = |id: u32| {
        targets
            .iter()
            .find(|t| t.player_id == id)
            .map(|t| t.score)
            .expect("target listed")
    };
    assert!(score(91) > score(92));
    assert!(score(93) > score(91));
    let order: Vec<u32> = targets.iter().map(|t| t.player_id).collect();
    assert_eq!(order, vec![93, 91, 92]);
}

#[test]
fn every_player_gets_a_prediction() {
    let (_, players, fixtures) = load();
    let predictions = predict_points(&players, &fixtures, 3);
    assert_eq!(predictions.len(), players.len());

    let injured = predictions.iter().find(|p| p.player_id == 4).expect("palmer");
    assert_eq!(injured.predicted_points, 0.0);
    // Unknown team has no fixtures.
    let loanee = predictions.iter().find(|p| p.player_id == 6).expect("loanee");
    assert_eq!(loanee.fixture_count, 0);
    assert_eq!(loanee.confidence, Confidence::Low);
    // Chelsea double gameweek.
    let jackson = predictions.iter().find(|p| p.player_id == 5).expect("jackson");
    assert_eq!(jackson.fixture_count, 2);
}

#[test]
fn captain_options_skip_benchwarmers_and_injured() {
    let (snapshot, players, fixtures) = load();
    let team_map = build_team_map(&snapshot.teams);
    let picks = score_captain_options(&players, &fixtures, &team_map, 3);

    let ids: HashSet<u32> = picks.iter().map(|p| p.player_id).collect();
    assert_eq!(ids, HashSet::from([1, 2, 3]));
    for pair in picks.windows(2) {
        assert!(pair[0].composite >= pair[1].composite);
    }
    let saka = picks.iter().find(|p| p.player_id == 2).expect("saka");
    assert_eq!(saka.tag, CaptainTag::Safe);
    assert_eq!(saka.opponents.len(), 1);
    assert_eq!(saka.opponents[0].team_short, "CHE");
    assert!(!saka.opponents[0].is_home);
    let mbeumo = picks.iter().find(|p| p.player_id == 3).expect("mbeumo");
    assert_eq!(mbeumo.tag, CaptainTag::Differential);
}

#[test]
fn zero_minute_player_is_never_a_captain_option() {
    let (snapshot, mut players, fixtures) = load();
    let team_map = build_team_map(&snapshot.teams);
    // Chelsea host at FDR 5 in gameweek 3.
    let jackson = players.iter().find(|p| p.id == 5).expect("jackson").clone();
    assert_eq!(jackson.minutes, 0);
    let mut unused = jackson.clone();
    unused.id = 50;
    unused.form = 9.0;
    let mut regular = unused.clone();
    regular.id = 51;
    regular.minutes = 90;
    players.push(unused);
    players.push(regular);

    let picks = score_captain_options(&players, &fixtures, &team_map, 3);
    let ids: HashSet<u32> = picks.iter().map(|p| p.player_id).collect();
    assert!(!ids.contains(&50));
    assert!(!ids.contains(&5));
    assert!(ids.contains(&51));
    let regular = picks.iter().find(|p| p.player_id == 51).expect("regular");
    assert!(regular.opponents.iter().any(|o| o.difficulty == 5));
}

#[test]
fn captain_options_empty_in_blank_gameweek() {
    let (snapshot, players, fixtures) = load();
    let team_map = build_team_map(&snapshot.teams);
    assert!(score_captain_options(&players, &fixtures, &team_map, 30).is_empty());
}

#[test]
fn transfer_targets_respect_filters() {
    let (_, players, fixtures) = load();
    let query = TransferQuery {
        start_gameweek: 2,
        horizon: 2,
        position: Some(Position::Midfielder),
        max_price: Some(10.0),
        exclude: HashSet::from([1]),
        limit: None,
    };
    let targets = score_transfer_targets(&players, &fixtures, &query);
    assert!(!targets.is_empty());
    for target in &targets {
        assert_eq!(target.position, Position::Midfielder);
        assert!(target.price <= 10.0);
        assert_ne!(target.player_id, 1);
        assert_ne!(target.player_id, 4);
    }
    let limited = score_transfer_targets(
        &players,
        &fixtures,
        &TransferQuery {
            limit: Some(1),
            ..query
        },
    );
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].player_id, targets[0].player_id);
}

#[test]
fn price_probability_is_bounded_and_monotonic() {
    let mut last = 0.0;
    for net in [1_000i64, 10_000, 50_000, 200_000, 1_000_000] {
        let p = change_probability(net, 20.0);
        assert!((0.0..1.0).contains(&p));
        assert!(p > last);
        assert_eq!(p, change_probability(-net, 20.0));
        last = p;
    }
    assert_eq!(change_probability(0, 50.0), 0.0);
    assert!(change_probability(50_000, 5.0) > change_probability(50_000, 60.0));
}

#[test]
fn price_forecast_splits_rises_and_falls() {
    let (_, players, _) = load();
    let forecast = predict_price_changes(&players);

    assert!(forecast.rises.iter().all(|r| r.direction == PriceDirection::Rise));
    assert!(forecast.falls.iter().all(|r| r.direction == PriceDirection::Fall));
    assert_eq!(forecast.rises[0].player_id, 3);
    assert_eq!(forecast.falls[0].player_id, 4);
    assert_eq!(forecast.falls[0].band, PriceChangeBand::Likely);
    // Zero net transfers are left out.
    let listed: HashSet<u32> = forecast
        .rises
        .iter()
        .chain(forecast.falls.iter())
        .map(|r| r.player_id)
        .collect();
    assert!(!listed.contains(&5));
}

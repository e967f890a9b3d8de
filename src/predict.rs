use std::collections::HashSet;

use serde::Serialize;

use crate::enrich::EnrichedPlayer;
use crate::model::{Fixture, FixtureSide, LAST_GAMEWEEK, Position, fixtures_by_team};
use crate::ranking::{cmp_score_desc, round2, truncate};

const FORM_SHARE: f64 = 0.7;
const PPG_SHARE: f64 = 0.3;
/// Per-step change in expected output for each difficulty point away from 3.
const DIFFICULTY_STEP: f64 = 0.1;

const HIGH_CONFIDENCE_MINUTES: u32 = 900;
const MEDIUM_CONFIDENCE_MINUTES: u32 = 270;

const TRANSFER_FORM_WEIGHT: f64 = 0.5;
const TRANSFER_FIXTURE_WEIGHT: f64 = 0.35;
const TRANSFER_VALUE_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointsPrediction {
    pub player_id: u32,
    pub web_name: String,
    pub team_short: String,
    pub position: Position,
    pub form_score: f64,
    /// 0-10, higher is easier.
    pub fixture_score: f64,
    pub fixture_count: usize,
    pub predicted_points: f64,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Default)]
pub struct TransferQuery {
    pub start_gameweek: u8,
    pub horizon: u8,
    pub position: Option<Position>,
    pub max_price: Option<f64>,
    /// Usually the manager's current squad.
    pub exclude: HashSet<u32>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferRecommendation {
    pub player_id: u32,
    pub web_name: String,
    pub team_short: String,
    pub position: Position,
    pub price: f64,
    pub form_score: f64,
    pub fixture_score: f64,
    pub value_score: f64,
    pub score: f64,
    pub fixture_count: usize,
    pub confidence: Confidence,
}

/// Multiplier applied to a player's per-match output against an opponent of
/// the given difficulty. Strictly decreasing: 1.2 at FDR 1 down to 0.8 at FDR 5.
pub fn difficulty_multiplier(difficulty: u8) -> f64 {
    1.0 + (3.0 - f64::from(difficulty)) * DIFFICULTY_STEP
}

/// 0-10 ease score for a run of fixtures; 0 when there are none.
pub fn fixture_score(sides: &[FixtureSide]) -> f64 {
    if sides.is_empty() {
        return 0.0;
    }
    let avg = sides.iter().map(|s| f64::from(s.difficulty)).sum::<f64>() / sides.len() as f64;
    ((6.0 - avg) * 2.0).clamp(0.0, 10.0)
}

pub fn confidence_for(minutes: u32, fixture_count: usize) -> Confidence {
    if fixture_count == 0 {
        return Confidence::Low;
    }
    if minutes >= HIGH_CONFIDENCE_MINUTES {
        Confidence::High
    } else if minutes >= MEDIUM_CONFIDENCE_MINUTES {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Expected points for every player in `gameweek`, best first.
pub fn predict_points(
    players: &[EnrichedPlayer],
    fixtures: &[Fixture],
    gameweek: u8,
) -> Vec<PointsPrediction> {
    let by_team = fixtures_by_team(fixtures, gameweek);

    let mut out: Vec<PointsPrediction> = players
        .iter()
        .map(|p| {
            let sides = by_team.get(&p.team_id).map(Vec::as_slice).unwrap_or(&[]);
            let form_score = form_score(p);
            let predicted: f64 = sides
                .iter()
                .map(|s| form_score * difficulty_multiplier(s.difficulty))
                .sum::<f64>()
                * p.availability();
            PointsPrediction {
                player_id: p.id,
                web_name: p.display_name.clone(),
                team_short: p.team_short.clone(),
                position: p.position,
                form_score: round2(form_score),
                fixture_score: round2(fixture_score(sides)),
                fixture_count: sides.len(),
                predicted_points: round2(predicted),
                confidence: confidence_for(p.minutes, sides.len()),
            }
        })
        .collect();

    out.sort_by(|a, b| {
        cmp_score_desc(a.predicted_points, b.predicted_points).then(a.player_id.cmp(&b.player_id))
    });
    out
}

/// Rank transfer-in targets over `query.horizon` gameweeks from `query.start_gameweek`.
pub fn score_transfer_targets(
    players: &[EnrichedPlayer],
    fixtures: &[Fixture],
    query: &TransferQuery,
) -> Vec<TransferRecommendation> {
    let horizon = query.horizon.max(1);
    let last = query
        .start_gameweek
        .saturating_add(horizon - 1)
        .min(LAST_GAMEWEEK);
    let windows: Vec<_> = (query.start_gameweek..=last)
        .map(|gw| fixtures_by_team(fixtures, gw))
        .collect();

    let mut out: Vec<TransferRecommendation> = players
        .iter()
        .filter(|p| p.minutes > 0 && p.availability() > 0.0)
        .filter(|p| !query.exclude.contains(&p.id))
        .filter(|p| query.position.is_none_or(|pos| pos == p.position))
        .filter(|p| query.max_price.is_none_or(|max| p.price <= max))
        .map(|p| {
            let sides: Vec<FixtureSide> = windows
                .iter()
                .filter_map(|by_team| by_team.get(&p.team_id))
                .flatten()
                .copied()
                .collect();
            let form_score = form_score(p);
            let fixture_score = fixture_score(&sides);
            let score = (TRANSFER_FORM_WEIGHT * form_score
                + TRANSFER_FIXTURE_WEIGHT * fixture_score
                + TRANSFER_VALUE_WEIGHT * p.value_score.max(0.0))
                * p.availability();
            TransferRecommendation {
                player_id: p.id,
                web_name: p.display_name.clone(),
                team_short: p.team_short.clone(),
                position: p.position,
                price: p.price,
                form_score: round2(form_score),
                fixture_score: round2(fixture_score),
                value_score: round2(p.value_score),
                score: round2(score),
                fixture_count: sides.len(),
                confidence: confidence_for(p.minutes, sides.len()),
            }
        })
        .collect();

    out.sort_by(|a, b| cmp_score_desc(a.score, b.score).then(a.player_id.cmp(&b.player_id)));
    truncate(out, query.limit)
}

fn form_score(player: &EnrichedPlayer) -> f64 {
    FORM_SHARE * player.form.max(0.0) + PPG_SHARE * player.points_per_game.max(0.0)
}

use serde::Serialize;

use crate::enrich::{EnrichedPlayer, TeamMap, team_short};
use crate::model::{Fixture, FixtureSide, Position, fixtures_by_team};
use crate::ranking::{cmp_score_desc, round2};

/// Ownership above this marks a pick as the template (safe) choice.
pub const SAFE_OWNERSHIP_THRESHOLD: f64 = 15.0;

const FORM_WEIGHT: f64 = 1.0;
const FIXTURE_WEIGHT: f64 = 0.8;
const HOME_BONUS: f64 = 0.3;
const XGI_PER_90_WEIGHT: f64 = 3.0;
const SET_PIECE_BONUS: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptainTag {
    Safe,
    Differential,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentCell {
    pub team_id: u32,
    pub team_short: String,
    pub difficulty: u8,
    pub is_home: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptainPick {
    pub player_id: u32,
    pub web_name: String,
    pub team_short: String,
    pub position: Position,
    pub composite: f64,
    pub form: f64,
    pub fixture_ease: f64,
    pub xgi_per_90: f64,
    pub set_piece_duty: bool,
    pub ownership: f64,
    pub total_points: i32,
    pub tag: CaptainTag,
    pub opponents: Vec<OpponentCell>,
}

/// Rank captain candidates for `gameweek`.
///
/// Players who have not played a minute, cannot play, or have no fixture
/// in the gameweek are left out. A double gameweek adds both fixtures' ease.
pub fn score_captain_options(
    players: &[EnrichedPlayer],
    fixtures: &[Fixture],
    team_map: &TeamMap,
    gameweek: u8,
) -> Vec<CaptainPick> {
    let by_team = fixtures_by_team(fixtures, gameweek);

    let mut picks: Vec<CaptainPick> = players
        .iter()
        .filter(|p| p.minutes > 0)
        .filter(|p| p.availability() > 0.0)
        .filter_map(|p| {
            let sides = by_team.get(&p.team_id)?;
            if sides.is_empty() {
                return None;
            }
            Some(build_pick(p, sides, team_map))
        })
        .collect();

    picks.sort_by(|a, b| {
        cmp_score_desc(a.composite, b.composite)
            .then(b.total_points.cmp(&a.total_points))
            .then(a.player_id.cmp(&b.player_id))
    });
    picks
}

pub fn fixture_ease(side: &FixtureSide) -> f64 {
    let base = f64::from(6 - side.difficulty);
    if side.is_home { base + HOME_BONUS } else { base }
}

fn build_pick(player: &EnrichedPlayer, sides: &[FixtureSide], team_map: &TeamMap) -> CaptainPick {
    let ease: f64 = sides.iter().map(fixture_ease).sum();
    let xgi_per_90 = player.xgi_per_90();
    let set_piece = if player.set_piece_duty {
        SET_PIECE_BONUS
    } else {
        0.0
    };
    let raw = FORM_WEIGHT * player.form.max(0.0)
        + FIXTURE_WEIGHT * ease
        + XGI_PER_90_WEIGHT * xgi_per_90
        + set_piece;
    let composite = raw * player.availability();

    let tag = if player.ownership > SAFE_OWNERSHIP_THRESHOLD {
        CaptainTag::Safe
    } else {
        CaptainTag::Differential
    };

    CaptainPick {
        player_id: player.id,
        web_name: player.display_name.clone(),
        team_short: player.team_short.clone(),
        position: player.position,
        composite: round2(composite),
        form: player.form,
        fixture_ease: round2(ease),
        xgi_per_90: round2(xgi_per_90),
        set_piece_duty: player.set_piece_duty,
        ownership: player.ownership,
        total_points: player.total_points,
        tag,
        opponents: sides
            .iter()
            .map(|side| OpponentCell {
                team_id: side.opponent_id,
                team_short: team_short(team_map, side.opponent_id),
                difficulty: side.difficulty,
                is_home: side.is_home,
            })
            .collect(),
    }
}

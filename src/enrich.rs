use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::model::{BootstrapSnapshot, PlayerStatus, Position, RawPlayer, Team};
use crate::ranking::format_price;

pub const UNKNOWN_TEAM: &str = "???";

pub type TeamMap = HashMap<u32, Team>;
pub type PlayerMap = HashMap<u32, EnrichedPlayer>;

/// Denormalized player view every scoring model consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedPlayer {
    pub id: u32,
    pub web_name: String,
    pub display_name: String,
    pub team_id: u32,
    pub team_short: String,
    pub position: Position,
    pub position_label: &'static str,
    pub status: PlayerStatus,
    pub now_cost: u16,
    pub price: f64,
    pub price_label: String,
    pub total_points: i32,
    pub minutes: u32,
    pub form: f64,
    pub ownership: f64,
    pub expected_points: f64,
    pub points_per_game: f64,
    pub xgi: f64,
    /// Season points per million spent.
    pub value_score: f64,
    pub transfers_in_event: i64,
    pub transfers_out_event: i64,
    pub chance_of_playing: Option<u8>,
    pub set_piece_duty: bool,
    pub news: String,
}

impl EnrichedPlayer {
    /// Expected share of a full appearance, in [0, 1].
    pub fn availability(&self) -> f64 {
        let chance = self.chance_of_playing.map(|c| f64::from(c) / 100.0);
        let value = match self.status {
            PlayerStatus::Fit => chance.unwrap_or(1.0),
            PlayerStatus::Doubtful => chance.unwrap_or(0.5),
            PlayerStatus::Injured | PlayerStatus::Suspended => 0.0,
            PlayerStatus::Unknown => chance.unwrap_or(0.0),
        };
        value.clamp(0.0, 1.0)
    }

    pub fn net_transfers(&self) -> i64 {
        self.transfers_in_event - self.transfers_out_event
    }

    pub fn xgi_per_90(&self) -> f64 {
        if self.minutes == 0 {
            return 0.0;
        }
        self.xgi / (f64::from(self.minutes) / 90.0)
    }
}

pub fn build_team_map(teams: &[Team]) -> TeamMap {
    teams.iter().map(|t| (t.id, t.clone())).collect()
}

pub fn team_short(team_map: &TeamMap, team_id: u32) -> String {
    team_map
        .get(&team_id)
        .map(|t| t.short_name.clone())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_TEAM.to_string())
}

/// Enriches every element with a known position; other element types are skipped.
pub fn enrich_players(snapshot: &BootstrapSnapshot) -> Vec<EnrichedPlayer> {
    let team_map = build_team_map(&snapshot.teams);
    snapshot
        .players
        .iter()
        .filter_map(|raw| {
            let player = enrich_player(raw, &team_map);
            if player.is_none() {
                debug!(
                    id = raw.id,
                    element_type = raw.element_type,
                    "skipping element without a squad position"
                );
            }
            player
        })
        .collect()
}

pub fn player_map(players: &[EnrichedPlayer]) -> PlayerMap {
    players.iter().map(|p| (p.id, p.clone())).collect()
}

pub fn enrich_player(raw: &RawPlayer, team_map: &TeamMap) -> Option<EnrichedPlayer> {
    let position = raw.position()?;
    let price = f64::from(raw.now_cost) / 10.0;
    let value_score = if price > 0.0 {
        f64::from(raw.total_points) / price
    } else {
        0.0
    };
    Some(EnrichedPlayer {
        id: raw.id,
        web_name: raw.web_name.clone(),
        display_name: display_name(raw),
        team_id: raw.team,
        team_short: team_short(team_map, raw.team),
        position,
        position_label: position.label(),
        status: raw.status,
        now_cost: raw.now_cost,
        price,
        price_label: format_price(raw.now_cost),
        total_points: raw.total_points,
        minutes: raw.minutes,
        form: parse_number_or_zero(&raw.form),
        ownership: parse_number_or_zero(&raw.selected_by_percent).clamp(0.0, 100.0),
        expected_points: parse_number_or_zero(&raw.ep_next),
        points_per_game: parse_number_or_zero(&raw.points_per_game),
        xgi: parse_number_or_zero(&raw.expected_goal_involvements),
        value_score,
        transfers_in_event: raw.transfers_in_event,
        transfers_out_event: raw.transfers_out_event,
        chance_of_playing: raw.chance_of_playing_next_round,
        set_piece_duty: has_set_piece_duty(raw),
        news: raw.news.trim().to_string(),
    })
}

/// Upstream sends numbers like `"5.2"`; anything unparseable or non-finite reads as 0.
pub fn parse_number_or_zero(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn display_name(raw: &RawPlayer) -> String {
    let web = raw.web_name.trim();
    if !web.is_empty() {
        return web.to_string();
    }
    let full = format!("{} {}", raw.first_name.trim(), raw.second_name.trim());
    let full = full.trim();
    if full.is_empty() {
        format!("Player {}", raw.id)
    } else {
        full.to_string()
    }
}

fn has_set_piece_duty(raw: &RawPlayer) -> bool {
    [
        raw.penalties_order,
        raw.direct_freekicks_order,
        raw.corners_and_indirect_freekicks_order,
    ]
    .iter()
    .any(|order| *order == Some(1))
}

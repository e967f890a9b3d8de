// Context handed to an external squad-optimizer assistant.
//
// Everything numeric is computed here so the assistant only has to weigh
// trade-offs. The struct serializes to JSON for API callers; `render_prompt`
// produces the same facts as a compact text block.

use std::fmt::Write as _;

use serde::Serialize;

use crate::captain::CaptainPick;
use crate::enrich::{PlayerMap, UNKNOWN_TEAM};
use crate::league_analysis::LeagueAnalysis;
use crate::model::Squad;
use crate::predict::TransferRecommendation;
use crate::ranking::format_price;

pub const MAX_CAPTAIN_OPTIONS: usize = 5;
pub const MAX_TRANSFER_TARGETS: usize = 8;
pub const MAX_COVER_THREATS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct SquadEntry {
    pub player_id: u32,
    pub web_name: String,
    pub team_short: String,
    pub position_label: &'static str,
    pub price_label: String,
    pub form: f64,
    pub starting: bool,
    pub captain: bool,
    pub availability: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaguePosition {
    pub rank: u32,
    pub total_points: i64,
    pub points_to_leader: i64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverThreat {
    pub player_id: u32,
    pub web_name: String,
    pub rival_ownership: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizerContext {
    pub gameweek: u8,
    pub squad: Vec<SquadEntry>,
    pub captain_options: Vec<CaptainPick>,
    pub transfer_targets: Vec<TransferRecommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub league: Option<LeaguePosition>,
    pub cover_threats: Vec<CoverThreat>,
}

pub fn system_prompt() -> String {
    "You are a fantasy Premier League squad advisor.\n\
     \n\
     Rules: 15-player squad (2 GKP, 5 DEF, 5 MID, 3 FWD), 11 start, max 3 per club.\n\
     One free transfer per gameweek; extra transfers cost 4 points each.\n\
     \n\
     You will receive the manager's squad, ranked captain options, transfer targets\n\
     and, when available, their mini-league position with players their rivals own\n\
     that they do not.\n\
     \n\
     Reply with:\n\
     1. CAPTAIN: one pick and one vice, with a sentence on why.\n\
     2. TRANSFERS: zero to two moves (out -> in), or roll the transfer.\n\
     3. LEAGUE: whether to cover a rival threat or chase a differential.\n\
     \n\
     Use the numbers provided and do not recompute them."
        .to_string()
}

pub fn build_optimizer_context(
    gameweek: u8,
    squad: &Squad,
    player_map: &PlayerMap,
    captain_picks: &[CaptainPick],
    transfer_targets: &[TransferRecommendation],
    league: Option<&LeagueAnalysis>,
) -> OptimizerContext {
    let mut picks: Vec<_> = squad.picks.iter().collect();
    picks.sort_by_key(|p| p.slot);

    let squad_entries = picks
        .into_iter()
        .map(|pick| match player_map.get(&pick.player_id) {
            Some(player) => SquadEntry {
                player_id: pick.player_id,
                web_name: player.web_name.clone(),
                team_short: player.team_short.clone(),
                position_label: player.position_label,
                price_label: player.price_label.clone(),
                form: player.form,
                starting: pick.is_starting(),
                captain: pick.is_captain,
                availability: player.availability(),
            },
            None => SquadEntry {
                player_id: pick.player_id,
                web_name: format!("Unknown #{}", pick.player_id),
                team_short: UNKNOWN_TEAM.to_string(),
                position_label: "???",
                price_label: format_price(0),
                form: 0.0,
                starting: pick.is_starting(),
                captain: pick.is_captain,
                availability: 0.0,
            },
        })
        .collect();

    let owned = squad.player_ids();
    let cover_threats = league
        .map(|analysis| {
            analysis
                .cover_differentials
                .iter()
                .filter(|row| !owned.contains(&row.player_id))
                .take(MAX_COVER_THREATS)
                .map(|row| CoverThreat {
                    player_id: row.player_id,
                    web_name: row.web_name.clone(),
                    rival_ownership: row.rival_ownership,
                })
                .collect()
        })
        .unwrap_or_default();

    OptimizerContext {
        gameweek,
        squad: squad_entries,
        captain_options: captain_picks
            .iter()
            .take(MAX_CAPTAIN_OPTIONS)
            .cloned()
            .collect(),
        transfer_targets: transfer_targets
            .iter()
            .take(MAX_TRANSFER_TARGETS)
            .cloned()
            .collect(),
        league: league.map(|analysis| LeaguePosition {
            rank: analysis.user_rank,
            total_points: analysis.user_total,
            points_to_leader: analysis.points_to_leader,
            sample_size: analysis.sample_size,
        }),
        cover_threats,
    }
}

/// Text rendering of the context for the assistant's user message.
pub fn render_prompt(ctx: &OptimizerContext) -> String {
    let mut out = String::with_capacity(2048);
    let _ = writeln!(out, "## GAMEWEEK {}\n", ctx.gameweek);

    out.push_str("## SQUAD\n");
    for entry in &ctx.squad {
        let role = if entry.captain {
            " (C)"
        } else if !entry.starting {
            " (bench)"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "- {} {} {} {} form {:.1} avail {:.0}%{}",
            entry.position_label,
            entry.web_name,
            entry.team_short,
            entry.price_label,
            entry.form,
            entry.availability * 100.0,
            role
        );
    }

    out.push_str("\n## CAPTAIN OPTIONS\n");
    for (idx, pick) in ctx.captain_options.iter().enumerate() {
        let opponents = pick
            .opponents
            .iter()
            .map(|o| {
                let venue = if o.is_home { "H" } else { "A" };
                format!("{} ({venue}) {}", o.team_short, o.difficulty)
            })
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "{}. {} {} score {:.2} vs {} own {:.1}%",
            idx + 1,
            pick.web_name,
            pick.team_short,
            pick.composite,
            opponents,
            pick.ownership
        );
    }

    out.push_str("\n## TRANSFER TARGETS\n");
    for target in &ctx.transfer_targets {
        let _ = writeln!(
            out,
            "- {} {} {} £{:.1}m score {:.2} ({} fixtures)",
            target.position.label(),
            target.web_name,
            target.team_short,
            target.price,
            target.score,
            target.fixture_count
        );
    }

    if let Some(league) = &ctx.league {
        let _ = writeln!(
            out,
            "\n## LEAGUE\nRank {} on {} points, {} behind the leader ({} rivals sampled)",
            league.rank, league.total_points, league.points_to_leader, league.sample_size
        );
        for threat in &ctx.cover_threats {
            let _ = writeln!(
                out,
                "- not owned: {} held by {:.0}% of rivals",
                threat.web_name, threat.rival_ownership
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Pick;

    #[test]
    fn unknown_players_get_placeholders() {
        let squad = Squad {
            picks: vec![Pick {
                player_id: 999,
                slot: 1,
                multiplier: 2,
                is_captain: true,
                is_vice_captain: false,
            }],
            active_chip: None,
        };
        let ctx = build_optimizer_context(5, &squad, &PlayerMap::new(), &[], &[], None);
        assert_eq!(ctx.squad.len(), 1);
        assert_eq!(ctx.squad[0].web_name, "Unknown #999");
        assert!(ctx.league.is_none());
        let text = render_prompt(&ctx);
        assert!(text.contains("Unknown #999"));
        assert!(text.contains("(C)"));
        assert!(!text.contains("## LEAGUE"));
    }
}

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::enrich::{PlayerMap, TeamMap, UNKNOWN_TEAM, team_short};
use crate::model::{LeagueStanding, Pick, RivalTeam, Squad};
use crate::ranking::{cmp_score_desc, percent, round2};

/// Attack differentials: players the user starts that at most this share of rivals own.
pub const ATTACK_MAX_RIVAL_OWNERSHIP: f64 = 30.0;
/// Cover differentials: players the user lacks that at least this share of rivals own.
pub const COVER_MIN_RIVAL_OWNERSHIP: f64 = 30.0;
/// Hypothetical hauls used for swing scenarios.
pub const SWING_POINTS: [i64; 4] = [2, 6, 10, 15];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UserRelation {
    Captain,
    Starting,
    Benched,
    NotOwned,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveOwnershipRow {
    pub player_id: u32,
    pub web_name: String,
    pub team_short: String,
    pub position_label: &'static str,
    pub form: f64,
    pub price: f64,
    pub global_ownership: f64,
    /// Share of sampled rivals with the player anywhere in the squad, 0-100.
    pub league_ownership: f64,
    /// Multiplier-weighted share (captains count double), 0-300.
    pub effective_ownership: f64,
    pub rival_owners: usize,
    pub rival_captains: usize,
    pub sample_size: usize,
    pub user_relation: UserRelation,
    pub user_multiplier: u8,
    /// User's weight minus the league's; positive gains ground when the player scores.
    pub eo_gap: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DifferentialRow {
    pub player_id: u32,
    pub web_name: String,
    pub team_short: String,
    pub position_label: &'static str,
    pub form: f64,
    pub price: f64,
    pub rival_ownership: f64,
    pub rival_owners: usize,
    pub sample_size: usize,
    /// Upside for attack rows, exposure for cover rows.
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwingOutcome {
    pub hypothetical_points: i64,
    /// (owning − not owning) × points; positive hurts the user.
    pub net_points: i64,
    /// `net_points` in units of the league's average points gap per rank place.
    pub rank_gap_units: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwingScenario {
    pub player_id: u32,
    pub web_name: String,
    pub rivals_owning: usize,
    pub rivals_not_owning: usize,
    pub outcomes: Vec<SwingOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptaincyShare {
    pub player_id: u32,
    pub web_name: String,
    pub rivals: usize,
    pub share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeagueAnalysis {
    pub requested_rivals: usize,
    pub sample_size: usize,
    pub failed_managers: Vec<u64>,
    pub user_rank: u32,
    pub user_total: i64,
    pub points_to_leader: i64,
    pub average_rank_gap: f64,
    pub effective_ownership: Vec<EffectiveOwnershipRow>,
    pub attack_differentials: Vec<DifferentialRow>,
    pub cover_differentials: Vec<DifferentialRow>,
    pub swing_scenarios: Vec<SwingScenario>,
    pub rival_captaincy: Vec<CaptaincyShare>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RivalComparison {
    pub manager_id: u64,
    pub entry_name: String,
    pub shared: Vec<u32>,
    pub user_only: Vec<u32>,
    pub rival_only: Vec<u32>,
    pub captain_match: bool,
    pub user_captain: Option<u32>,
    pub rival_captain: Option<u32>,
    pub points_gap: i64,
}

/// The `count` managers ranked closest to the user, ordered by rank.
///
/// Distance is |rank − user rank|; ties go to the lower manager id. When the
/// user is not in `standings` the league leaders are returned instead.
pub fn select_rivals(
    standings: &[LeagueStanding],
    user_manager_id: u64,
    count: usize,
) -> Vec<LeagueStanding> {
    let user_rank = standings
        .iter()
        .find(|s| s.manager_id == user_manager_id)
        .map(|s| s.rank)
        .unwrap_or(1);

    let mut candidates: Vec<&LeagueStanding> = standings
        .iter()
        .filter(|s| s.manager_id != user_manager_id)
        .collect();
    candidates.sort_by(|a, b| {
        a.rank
            .abs_diff(user_rank)
            .cmp(&b.rank.abs_diff(user_rank))
            .then(a.manager_id.cmp(&b.manager_id))
    });
    candidates.truncate(count);

    let mut out: Vec<LeagueStanding> = candidates.into_iter().cloned().collect();
    out.sort_by(|a, b| a.rank.cmp(&b.rank).then(a.manager_id.cmp(&b.manager_id)));
    out
}

/// Set comparison of the user's squad against one rival's. `None` when the
/// rival's squad failed to load.
pub fn compare_with_rival(user: &Squad, rival: &RivalTeam) -> Option<RivalComparison> {
    let rival_squad = rival.squad.loaded()?;
    let user_ids = user.player_ids();
    let rival_ids = rival_squad.player_ids();

    let user_captain = user.captain();
    let rival_captain = rival_squad.captain();

    Some(RivalComparison {
        manager_id: rival.manager_id(),
        entry_name: rival.standing.entry_name.clone(),
        shared: user_ids.intersection(&rival_ids).copied().collect(),
        user_only: user_ids.difference(&rival_ids).copied().collect(),
        rival_only: rival_ids.difference(&user_ids).copied().collect(),
        captain_match: user_captain.is_some() && user_captain == rival_captain,
        user_captain,
        rival_captain,
        points_gap: rival.points_gap,
    })
}

pub fn compare_with_rivals(user: &Squad, rivals: &[RivalTeam]) -> Vec<RivalComparison> {
    rivals
        .iter()
        .filter_map(|rival| compare_with_rival(user, rival))
        .collect()
}

#[derive(Debug, Default)]
struct OwnershipTally {
    owners: usize,
    captains: usize,
    weight: u32,
}

/// Effective ownership, differentials and swing scenarios for the user
/// against the sampled rivals. Rivals whose squad failed to load are listed
/// in `failed_managers` and left out of every percentage.
pub fn analyze_league(
    user_squad: &Squad,
    user_standing: &LeagueStanding,
    rivals: &[RivalTeam],
    leader_total: i64,
    player_map: &PlayerMap,
    team_map: &TeamMap,
) -> LeagueAnalysis {
    let loaded: Vec<(&RivalTeam, &Squad)> = rivals
        .iter()
        .filter_map(|r| r.squad.loaded().map(|squad| (r, squad)))
        .collect();
    let failed_managers: Vec<u64> = rivals
        .iter()
        .filter(|r| !r.squad.is_loaded())
        .map(|r| r.manager_id())
        .collect();
    let sample_size = loaded.len();
    debug!(
        requested = rivals.len(),
        sample_size,
        failed = failed_managers.len(),
        "analyzing league sample"
    );

    let user_total = user_standing.total_points;
    let average_rank_gap = average_rank_gap(user_standing, leader_total, &loaded);

    let mut analysis = LeagueAnalysis {
        requested_rivals: rivals.len(),
        sample_size,
        failed_managers,
        user_rank: user_standing.rank,
        user_total,
        points_to_leader: (leader_total - user_total).max(0),
        average_rank_gap: round2(average_rank_gap),
        effective_ownership: Vec::new(),
        attack_differentials: Vec::new(),
        cover_differentials: Vec::new(),
        swing_scenarios: Vec::new(),
        rival_captaincy: Vec::new(),
    };
    if sample_size == 0 {
        return analysis;
    }

    let mut tallies: BTreeMap<u32, OwnershipTally> = BTreeMap::new();
    for pick in &user_squad.picks {
        tallies.entry(pick.player_id).or_default();
    }
    for (_, squad) in &loaded {
        for pick in &squad.picks {
            let tally = tallies.entry(pick.player_id).or_default();
            tally.owners += 1;
            tally.weight += u32::from(pick.multiplier);
            if pick.is_captain {
                tally.captains += 1;
            }
        }
    }

    let user_picks: HashMap<u32, &Pick> =
        user_squad.picks.iter().map(|p| (p.player_id, p)).collect();

    let mut rows: Vec<EffectiveOwnershipRow> = tallies
        .iter()
        .map(|(player_id, tally)| {
            build_eo_row(
                *player_id,
                tally,
                user_picks.get(player_id).copied(),
                sample_size,
                player_map,
                team_map,
            )
        })
        .collect();
    rows.sort_by(|a, b| {
        cmp_score_desc(a.effective_ownership, b.effective_ownership)
            .then(a.player_id.cmp(&b.player_id))
    });

    analysis.attack_differentials = attack_differentials(&rows);
    analysis.cover_differentials = cover_differentials(&rows);
    analysis.swing_scenarios = analysis
        .cover_differentials
        .iter()
        .map(|row| swing_scenario(row, sample_size, average_rank_gap))
        .collect();
    analysis.rival_captaincy = rival_captaincy(&rows, sample_size);
    analysis.effective_ownership = rows;
    analysis
}

fn build_eo_row(
    player_id: u32,
    tally: &OwnershipTally,
    user_pick: Option<&Pick>,
    sample_size: usize,
    player_map: &PlayerMap,
    team_map: &TeamMap,
) -> EffectiveOwnershipRow {
    let player = player_map.get(&player_id);
    let user_relation = match user_pick {
        Some(p) if p.is_captain => UserRelation::Captain,
        Some(p) if p.is_starting() => UserRelation::Starting,
        Some(_) => UserRelation::Benched,
        None => UserRelation::NotOwned,
    };
    let user_multiplier = user_pick.map(|p| p.multiplier).unwrap_or(0);
    let effective_ownership = if sample_size == 0 {
        0.0
    } else {
        f64::from(tally.weight) / sample_size as f64 * 100.0
    };

    EffectiveOwnershipRow {
        player_id,
        web_name: player
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| format!("Unknown #{player_id}")),
        team_short: player
            .map(|p| team_short(team_map, p.team_id))
            .unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
        position_label: player.map(|p| p.position_label).unwrap_or(UNKNOWN_TEAM),
        form: player.map(|p| p.form).unwrap_or(0.0),
        price: player.map(|p| p.price).unwrap_or(0.0),
        global_ownership: player.map(|p| p.ownership).unwrap_or(0.0),
        league_ownership: round2(percent(tally.owners, sample_size)),
        effective_ownership: round2(effective_ownership),
        rival_owners: tally.owners,
        rival_captains: tally.captains,
        sample_size,
        user_relation,
        user_multiplier,
        eo_gap: round2(f64::from(user_multiplier) * 100.0 - effective_ownership),
    }
}

fn differential_row(row: &EffectiveOwnershipRow, score: f64) -> DifferentialRow {
    DifferentialRow {
        player_id: row.player_id,
        web_name: row.web_name.clone(),
        team_short: row.team_short.clone(),
        position_label: row.position_label,
        form: row.form,
        price: row.price,
        rival_ownership: row.league_ownership,
        rival_owners: row.rival_owners,
        sample_size: row.sample_size,
        score: round2(score),
    }
}

fn attack_differentials(rows: &[EffectiveOwnershipRow]) -> Vec<DifferentialRow> {
    let mut out: Vec<DifferentialRow> = rows
        .iter()
        .filter(|r| matches!(r.user_relation, UserRelation::Captain | UserRelation::Starting))
        .filter(|r| r.league_ownership <= ATTACK_MAX_RIVAL_OWNERSHIP)
        .map(|r| {
            let upside = r.form.max(0.0) * (1.0 - r.league_ownership / 100.0);
            differential_row(r, upside)
        })
        .collect();
    out.sort_by(|a, b| cmp_score_desc(a.score, b.score).then(a.player_id.cmp(&b.player_id)));
    out
}

fn cover_differentials(rows: &[EffectiveOwnershipRow]) -> Vec<DifferentialRow> {
    let mut out: Vec<DifferentialRow> = rows
        .iter()
        .filter(|r| r.user_relation == UserRelation::NotOwned)
        .filter(|r| r.league_ownership >= COVER_MIN_RIVAL_OWNERSHIP)
        .map(|r| {
            let exposure = r.form.max(0.0) * r.effective_ownership / 100.0;
            differential_row(r, exposure)
        })
        .collect();
    out.sort_by(|a, b| {
        cmp_score_desc(a.score, b.score)
            .then(b.rival_owners.cmp(&a.rival_owners))
            .then(a.player_id.cmp(&b.player_id))
    });
    out
}

fn swing_scenario(row: &DifferentialRow, sample_size: usize, rank_gap: f64) -> SwingScenario {
    let owning = row.rival_owners.min(sample_size);
    let not_owning = sample_size - owning;
    let balance = owning as i64 - not_owning as i64;
    SwingScenario {
        player_id: row.player_id,
        web_name: row.web_name.clone(),
        rivals_owning: owning,
        rivals_not_owning: not_owning,
        outcomes: SWING_POINTS
            .iter()
            .map(|points| {
                let net_points = balance * points;
                SwingOutcome {
                    hypothetical_points: *points,
                    net_points,
                    rank_gap_units: round2(net_points as f64 / rank_gap),
                }
            })
            .collect(),
    }
}

fn rival_captaincy(rows: &[EffectiveOwnershipRow], sample_size: usize) -> Vec<CaptaincyShare> {
    let mut out: Vec<CaptaincyShare> = rows
        .iter()
        .filter(|r| r.rival_captains > 0)
        .map(|r| CaptaincyShare {
            player_id: r.player_id,
            web_name: r.web_name.clone(),
            rivals: r.rival_captains,
            share: round2(percent(r.rival_captains, sample_size)),
        })
        .collect();
    out.sort_by(|a, b| b.rivals.cmp(&a.rivals).then(a.player_id.cmp(&b.player_id)));
    out
}

/// Points separating adjacent rank places, at least 1.
///
/// Uses the leader-to-user spread when the user is not top; otherwise falls
/// back to the sampled rivals' gaps per rank place.
fn average_rank_gap(
    user: &LeagueStanding,
    leader_total: i64,
    loaded: &[(&RivalTeam, &Squad)],
) -> f64 {
    if user.rank > 1 && leader_total > user.total_points {
        let places = f64::from(user.rank - 1);
        return ((leader_total - user.total_points) as f64 / places).max(1.0);
    }

    let per_place: Vec<f64> = loaded
        .iter()
        .filter_map(|(rival, _)| {
            let places = rival.standing.rank.abs_diff(user.rank);
            if places == 0 {
                return None;
            }
            Some(rival.points_gap.unsigned_abs() as f64 / f64::from(places))
        })
        .collect();
    if per_place.is_empty() {
        return 1.0;
    }
    (per_place.iter().sum::<f64>() / per_place.len() as f64).max(1.0)
}

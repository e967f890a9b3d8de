use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::model::{Chip, ChipUsage, Fetched, RivalTeam};

/// Each chip can be played once in gameweeks 1-19 and once in 20-38.
pub const FIRST_HALF_LAST_GAMEWEEK: u8 = 19;
/// Chips played this many gameweeks back (or this gameweek) raise an alert.
pub const RECENT_CHIP_WINDOW: u8 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct RivalChipStatus {
    pub manager_id: u64,
    pub entry_name: String,
    pub rank: u32,
    pub points_gap: i64,
    pub available: Vec<Chip>,
    pub used: Vec<ChipUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChipAlert {
    pub manager_id: u64,
    pub entry_name: String,
    pub chip: Chip,
    pub gameweek: u8,
    pub gameweeks_ago: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChipAdvantage {
    pub chip: Chip,
    pub user_available: bool,
    pub rivals_with: usize,
    pub rivals_without: usize,
    pub sample_size: usize,
}

/// A rival still holding chips the user has already spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChipThreat {
    pub manager_id: u64,
    pub entry_name: String,
    pub points_gap: i64,
    pub chips: Vec<Chip>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RivalChipAnalysis {
    pub current_gameweek: u8,
    pub user_available: Vec<Chip>,
    pub user_used: Vec<ChipUsage>,
    pub sample_size: usize,
    pub failed_managers: Vec<u64>,
    pub rivals: Vec<RivalChipStatus>,
    pub alerts: Vec<ChipAlert>,
    pub advantages: Vec<ChipAdvantage>,
    pub threats: Vec<ChipThreat>,
}

pub fn season_half(gameweek: u8) -> u8 {
    if gameweek <= FIRST_HALF_LAST_GAMEWEEK { 1 } else { 2 }
}

pub fn chip_available(usages: &[ChipUsage], chip: Chip, current_gw: u8) -> bool {
    let half = season_half(current_gw);
    !usages
        .iter()
        .any(|u| u.chip == chip && season_half(u.gameweek) == half && u.gameweek <= current_gw)
}

pub fn available_chips(usages: &[ChipUsage], current_gw: u8) -> Vec<Chip> {
    Chip::ALL
        .into_iter()
        .filter(|chip| chip_available(usages, *chip, current_gw))
        .collect()
}

pub fn analyze_rival_chips(
    user_history: &[ChipUsage],
    rivals: &[RivalTeam],
    rival_chip_history: &HashMap<u64, Fetched<Vec<ChipUsage>>>,
    user_total: i64,
    current_gw: u8,
) -> RivalChipAnalysis {
    let user_available = available_chips(user_history, current_gw);
    let mut user_used: Vec<ChipUsage> = user_history.to_vec();
    user_used.sort_by_key(|u| (u.gameweek, u.chip));

    let mut statuses = Vec::new();
    let mut failed_managers = Vec::new();
    for rival in rivals {
        let history = rival_chip_history
            .get(&rival.manager_id())
            .and_then(Fetched::loaded);
        let Some(history) = history else {
            failed_managers.push(rival.manager_id());
            continue;
        };
        let mut used = history.clone();
        used.sort_by_key(|u| (u.gameweek, u.chip));
        statuses.push(RivalChipStatus {
            manager_id: rival.manager_id(),
            entry_name: rival.standing.entry_name.clone(),
            rank: rival.standing.rank,
            points_gap: rival.standing.total_points - user_total,
            available: available_chips(history, current_gw),
            used,
        });
    }
    debug!(
        sample_size = statuses.len(),
        failed = failed_managers.len(),
        "analyzing rival chips"
    );

    let alerts = recent_alerts(&statuses, current_gw);
    let advantages = chip_advantages(&user_available, &statuses);
    let threats = chip_threats(&user_available, &statuses);

    RivalChipAnalysis {
        current_gameweek: current_gw,
        user_available,
        user_used,
        sample_size: statuses.len(),
        failed_managers,
        rivals: statuses,
        alerts,
        advantages,
        threats,
    }
}

fn recent_alerts(statuses: &[RivalChipStatus], current_gw: u8) -> Vec<ChipAlert> {
    let earliest = current_gw.saturating_sub(RECENT_CHIP_WINDOW);
    let mut alerts: Vec<ChipAlert> = statuses
        .iter()
        .flat_map(|status| {
            status
                .used
                .iter()
                .filter(|u| u.gameweek >= earliest && u.gameweek <= current_gw)
                .map(|u| ChipAlert {
                    manager_id: status.manager_id,
                    entry_name: status.entry_name.clone(),
                    chip: u.chip,
                    gameweek: u.gameweek,
                    gameweeks_ago: current_gw - u.gameweek,
                })
        })
        .collect();
    alerts.sort_by(|a, b| {
        a.gameweeks_ago
            .cmp(&b.gameweeks_ago)
            .then(a.manager_id.cmp(&b.manager_id))
            .then(a.chip.cmp(&b.chip))
    });
    alerts
}

fn chip_advantages(user_available: &[Chip], statuses: &[RivalChipStatus]) -> Vec<ChipAdvantage> {
    let mut out: Vec<ChipAdvantage> = Chip::ALL
        .into_iter()
        .map(|chip| {
            let rivals_with = statuses
                .iter()
                .filter(|s| s.available.contains(&chip))
                .count();
            ChipAdvantage {
                chip,
                user_available: user_available.contains(&chip),
                rivals_with,
                rivals_without: statuses.len() - rivals_with,
                sample_size: statuses.len(),
            }
        })
        .collect();
    out.sort_by(|a, b| {
        b.user_available
            .cmp(&a.user_available)
            .then(b.rivals_without.cmp(&a.rivals_without))
            .then(a.chip.cmp(&b.chip))
    });
    out
}

fn chip_threats(user_available: &[Chip], statuses: &[RivalChipStatus]) -> Vec<ChipThreat> {
    let mut out: Vec<ChipThreat> = statuses
        .iter()
        .filter_map(|status| {
            let chips: Vec<Chip> = status
                .available
                .iter()
                .filter(|chip| !user_available.contains(chip))
                .copied()
                .collect();
            if chips.is_empty() {
                return None;
            }
            Some(ChipThreat {
                manager_id: status.manager_id,
                entry_name: status.entry_name.clone(),
                points_gap: status.points_gap,
                chips,
            })
        })
        .collect();
    out.sort_by(|a, b| {
        a.points_gap
            .unsigned_abs()
            .cmp(&b.points_gap.unsigned_abs())
            .then(a.manager_id.cmp(&b.manager_id))
    });
    out
}

use std::collections::{HashMap, HashSet};

use chrono::{Duration as ChronoDuration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::FetchError;
use crate::league_fetch::SquadSource;
use crate::model::{
    BootstrapSnapshot, Chip, ChipUsage, Fixture, Gameweek, LAST_GAMEWEEK, LeagueStanding, Pick,
    PlayerStatus, Position, RawPlayer, Squad, Team,
};

const TEAMS: &[(&str, &str)] = &[
    ("Arsenal", "ARS"),
    ("Aston Villa", "AVL"),
    ("Bournemouth", "BOU"),
    ("Brentford", "BRE"),
    ("Brighton", "BHA"),
    ("Burnley", "BUR"),
    ("Chelsea", "CHE"),
    ("Crystal Palace", "CRY"),
    ("Everton", "EVE"),
    ("Fulham", "FUL"),
    ("Leeds", "LEE"),
    ("Liverpool", "LIV"),
    ("Man City", "MCI"),
    ("Man Utd", "MUN"),
    ("Newcastle", "NEW"),
    ("Nott'm Forest", "NFO"),
    ("Sunderland", "SUN"),
    ("Spurs", "TOT"),
    ("West Ham", "WHU"),
    ("Wolves", "WOL"),
];

/// Squad shape per team: goalkeepers, defenders, midfielders, forwards.
const ROSTER: [(Position, usize); 4] = [
    (Position::Goalkeeper, 3),
    (Position::Defender, 9),
    (Position::Midfielder, 10),
    (Position::Forward, 8),
];

/// Manager squad shape: (position, starters, bench).
const SQUAD_SHAPE: [(Position, usize, usize); 4] = [
    (Position::Goalkeeper, 1, 1),
    (Position::Defender, 4, 1),
    (Position::Midfielder, 4, 1),
    (Position::Forward, 2, 1),
];

const MANAGER_ID_BASE: u64 = 40_000;

#[derive(Debug, Clone)]
pub struct DemoLeague {
    pub bootstrap: BootstrapSnapshot,
    pub fixtures: Vec<Fixture>,
    pub standings: Vec<LeagueStanding>,
    pub squads: HashMap<u64, Squad>,
    pub chips: HashMap<u64, Vec<ChipUsage>>,
    pub user_manager_id: u64,
    pub current_gameweek: u8,
}

impl DemoLeague {
    pub fn user_squad(&self) -> Squad {
        self.squads
            .get(&self.user_manager_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn user_standing(&self) -> Option<&LeagueStanding> {
        self.standings
            .iter()
            .find(|s| s.manager_id == self.user_manager_id)
    }

    /// A source serving this league's data; managers in `failing` error out.
    pub fn source(&self, failing: &[u64]) -> DemoSource {
        DemoSource {
            squads: self.squads.clone(),
            chips: self.chips.clone(),
            failing: failing.iter().copied().collect(),
        }
    }
}

pub struct DemoSource {
    squads: HashMap<u64, Squad>,
    chips: HashMap<u64, Vec<ChipUsage>>,
    failing: HashSet<u64>,
}

impl SquadSource for DemoSource {
    fn fetch_squad(&self, manager_id: u64, _gameweek: u8) -> Result<Squad, FetchError> {
        if self.failing.contains(&manager_id) {
            return Err(FetchError::Source(format!("manager {manager_id} unavailable")));
        }
        self.squads
            .get(&manager_id)
            .cloned()
            .ok_or_else(|| FetchError::Source(format!("manager {manager_id} not found")))
    }

    fn fetch_chip_history(&self, manager_id: u64) -> Result<Vec<ChipUsage>, FetchError> {
        if self.failing.contains(&manager_id) {
            return Err(FetchError::Source(format!("manager {manager_id} unavailable")));
        }
        Ok(self.chips.get(&manager_id).cloned().unwrap_or_default())
    }
}

/// Build a full synthetic season deterministically from `seed`.
pub fn demo_league(seed: u64, managers: usize, current_gameweek: u8) -> DemoLeague {
    let mut rng = StdRng::seed_from_u64(seed);
    let current_gameweek = current_gameweek.clamp(1, LAST_GAMEWEEK);

    let teams: Vec<Team> = TEAMS
        .iter()
        .enumerate()
        .map(|(idx, (name, short))| Team {
            id: idx as u32 + 1,
            name: name.to_string(),
            short_name: short.to_string(),
            strength: rng.gen_range(2..=5),
        })
        .collect();

    let players = seed_players(&mut rng, &teams, current_gameweek);
    let fixtures = seed_fixtures(&mut rng, &teams, current_gameweek);
    let gameweeks = seed_gameweeks(current_gameweek);

    let managers = managers.max(2);
    let standings = seed_standings(&mut rng, managers, current_gameweek);
    let user_manager_id = standings[managers / 5].manager_id;

    let squads = standings
        .iter()
        .map(|s| (s.manager_id, seed_squad(&mut rng, &players)))
        .collect();
    let chips = standings
        .iter()
        .map(|s| (s.manager_id, seed_chips(&mut rng, current_gameweek)))
        .collect();

    DemoLeague {
        bootstrap: BootstrapSnapshot {
            players,
            teams,
            gameweeks,
        },
        fixtures,
        standings,
        squads,
        chips,
        user_manager_id,
        current_gameweek,
    }
}

fn seed_players(rng: &mut StdRng, teams: &[Team], current_gameweek: u8) -> Vec<RawPlayer> {
    let played = f64::from(current_gameweek.saturating_sub(1));
    let mut out = Vec::new();
    let mut next_id = 1u32;
    for team in teams {
        for (position, count) in ROSTER {
            for slot in 0..count {
                let id = next_id;
                next_id += 1;
                let regular = slot < count / 2;
                let minutes = if regular {
                    (played * rng.gen_range(60.0..90.0)) as u32
                } else if rng.gen_bool(0.5) {
                    (played * rng.gen_range(0.0..30.0)) as u32
                } else {
                    0
                };
                let form = if minutes == 0 {
                    0.0
                } else {
                    rng.gen_range(0.0..9.0)
                };
                let ownership = rng.gen_range(0.0f64..1.0).powi(4) * 60.0;
                let base_cost: u16 = match position {
                    Position::Goalkeeper => 40,
                    Position::Defender => 40,
                    Position::Midfielder => 45,
                    Position::Forward => 45,
                };
                let now_cost = base_cost + rng.gen_range(0..=(if regular { 100 } else { 20 }));
                let total_points = (form * played * 0.8) as i32;
                let status = match rng.gen_range(0..20) {
                    0 => PlayerStatus::Injured,
                    1 => PlayerStatus::Doubtful,
                    2 if !regular => PlayerStatus::Suspended,
                    _ => PlayerStatus::Fit,
                };
                out.push(RawPlayer {
                    id,
                    web_name: format!("{}{}", team.short_name, id),
                    first_name: "Demo".to_string(),
                    second_name: format!("Player {id}"),
                    team: team.id,
                    element_type: u8::from(position),
                    status,
                    now_cost,
                    total_points,
                    minutes,
                    form: format!("{form:.1}"),
                    selected_by_percent: format!("{ownership:.1}"),
                    ep_next: format!("{:.1}", form * 0.9),
                    points_per_game: format!("{:.1}", form * 0.85),
                    expected_goal_involvements: format!(
                        "{:.2}",
                        f64::from(minutes) / 90.0 * rng.gen_range(0.0..0.6)
                    ),
                    transfers_in_event: rng.gen_range(0..120_000),
                    transfers_out_event: rng.gen_range(0..120_000),
                    chance_of_playing_next_round: match status {
                        PlayerStatus::Doubtful => Some(rng.gen_range(1..=3) * 25),
                        PlayerStatus::Injured | PlayerStatus::Suspended => Some(0),
                        _ => None,
                    },
                    penalties_order: (regular && slot == 0 && position != Position::Goalkeeper)
                        .then_some(1),
                    direct_freekicks_order: None,
                    corners_and_indirect_freekicks_order: None,
                    news: String::new(),
                });
            }
        }
    }
    out
}

/// Double round robin with the circle method; second half mirrors the first.
fn seed_fixtures(rng: &mut StdRng, teams: &[Team], current_gameweek: u8) -> Vec<Fixture> {
    let n = teams.len();
    let mut order: Vec<usize> = (0..n).collect();
    let season_start = NaiveDate::from_ymd_opt(2025, 8, 16)
        .and_then(|d| d.and_hms_opt(14, 0, 0))
        .map(|dt| dt.and_utc());

    let mut out = Vec::new();
    let mut next_id = 1u32;
    for round in 0..(n - 1) {
        for i in 0..(n / 2) {
            let (a, b) = (order[i], order[n - 1 - i]);
            let (home, away) = if (round + i) % 2 == 0 { (a, b) } else { (b, a) };
            for (gw, h, w) in [
                (round as u8 + 1, home, away),
                (round as u8 + 1 + (n as u8 - 1), away, home),
            ] {
                let finished = gw < current_gameweek;
                let kickoff = season_start
                    .map(|start| {
                        start
                            + ChronoDuration::days(7 * i64::from(gw - 1))
                            + ChronoDuration::hours(i as i64)
                    })
                    .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                    .unwrap_or_default();
                out.push(Fixture {
                    id: next_id,
                    gameweek: Some(gw),
                    team_h: teams[h].id,
                    team_a: teams[w].id,
                    team_h_difficulty: teams[w].strength.clamp(1, 5),
                    team_a_difficulty: (teams[h].strength + 1).clamp(1, 5),
                    finished,
                    team_h_score: finished.then(|| rng.gen_range(0..4)),
                    team_a_score: finished.then(|| rng.gen_range(0..3)),
                    kickoff_time: kickoff,
                });
                next_id += 1;
            }
        }
        order[1..].rotate_right(1);
    }
    out
}

fn seed_gameweeks(current_gameweek: u8) -> Vec<Gameweek> {
    (1..=LAST_GAMEWEEK)
        .map(|id| Gameweek {
            id,
            name: format!("Gameweek {id}"),
            deadline_time: NaiveDate::from_ymd_opt(2025, 8, 15)
                .and_then(|d| d.and_hms_opt(17, 30, 0))
                .map(|dt| dt.and_utc() + ChronoDuration::days(7 * i64::from(id - 1)))
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                .unwrap_or_default(),
            finished: id < current_gameweek,
            is_current: id == current_gameweek,
            is_next: id == current_gameweek + 1,
        })
        .collect()
}

fn seed_standings(rng: &mut StdRng, managers: usize, current_gameweek: u8) -> Vec<LeagueStanding> {
    let mut total = i64::from(current_gameweek) * 62;
    (0..managers)
        .map(|idx| {
            let rank = idx as u32 + 1;
            if idx > 0 {
                total -= rng.gen_range(0..12);
            }
            LeagueStanding {
                manager_id: MANAGER_ID_BASE + u64::from(rank) * 3,
                entry_name: format!("Demo XI {rank}"),
                player_name: format!("Manager {rank}"),
                rank,
                total_points: total,
                event_total: rng.gen_range(30..90),
            }
        })
        .collect()
}

fn seed_squad(rng: &mut StdRng, players: &[RawPlayer]) -> Squad {
    let mut starters = Vec::new();
    let mut bench = Vec::new();
    for (position, start, sub) in SQUAD_SHAPE {
        let mut pool: Vec<&RawPlayer> = players
            .iter()
            .filter(|p| p.position() == Some(position))
            .collect();
        pool.sort_by(|a, b| {
            b.selected_by_percent
                .parse::<f64>()
                .unwrap_or(0.0)
                .total_cmp(&a.selected_by_percent.parse::<f64>().unwrap_or(0.0))
                .then(a.id.cmp(&b.id))
        });
        pool.truncate((start + sub) * 4);
        let chosen: Vec<u32> = pool
            .choose_multiple(rng, start + sub)
            .map(|p| p.id)
            .collect();
        starters.extend_from_slice(&chosen[..start]);
        bench.extend_from_slice(&chosen[start..]);
    }

    let captain_idx = rng.gen_range(0..starters.len());
    let vice_idx = (captain_idx + 1) % starters.len();
    let picks = starters
        .iter()
        .chain(bench.iter())
        .enumerate()
        .map(|(idx, player_id)| {
            let slot = idx as u8 + 1;
            let is_captain = idx == captain_idx;
            Pick {
                player_id: *player_id,
                slot,
                multiplier: if slot > 11 {
                    0
                } else if is_captain {
                    2
                } else {
                    1
                },
                is_captain,
                is_vice_captain: idx == vice_idx,
            }
        })
        .collect();
    Squad {
        picks,
        active_chip: None,
    }
}

fn seed_chips(rng: &mut StdRng, current_gameweek: u8) -> Vec<ChipUsage> {
    let mut out = Vec::new();
    for chip in Chip::ALL {
        if rng.gen_bool(0.35) {
            out.push(ChipUsage {
                chip,
                gameweek: rng.gen_range(1..=current_gameweek),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_league() {
        let a = demo_league(7, 20, 12);
        let b = demo_league(7, 20, 12);
        assert_eq!(a.bootstrap.players.len(), b.bootstrap.players.len());
        assert_eq!(a.standings, b.standings);
        assert_eq!(a.user_squad().player_ids(), b.user_squad().player_ids());
    }

    #[test]
    fn every_team_plays_each_gameweek_once() {
        let league = demo_league(1, 10, 5);
        assert_eq!(league.fixtures.len(), 380);
        for gw in 1..=LAST_GAMEWEEK {
            let count = league
                .fixtures
                .iter()
                .filter(|f| f.gameweek == Some(gw))
                .count();
            assert_eq!(count, 10, "gameweek {gw}");
        }
    }

    #[test]
    fn squads_have_fifteen_distinct_players() {
        let league = demo_league(3, 8, 10);
        for squad in league.squads.values() {
            assert_eq!(squad.picks.len(), 15);
            assert_eq!(squad.player_ids().len(), 15);
            assert_eq!(squad.picks.iter().filter(|p| p.is_captain).count(), 1);
        }
    }
}

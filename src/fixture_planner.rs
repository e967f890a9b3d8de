use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{FIRST_GAMEWEEK, Fixture, FixtureSide, LAST_GAMEWEEK, Team};
use crate::ranking::round2;

/// Difficulty charged for a gameweek in which a team does not play.
pub const BLANK_GAMEWEEK_DIFFICULTY: f64 = 5.0;
/// Reduction applied to a double gameweek's mean difficulty.
pub const DOUBLE_GAMEWEEK_BONUS: f64 = 0.5;
/// Minimum |delta| between windows to call a swing. Equal counts.
pub const SWING_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureCell {
    pub gameweek: u8,
    pub opponent_id: u32,
    pub opponent_short: String,
    pub difficulty: u8,
    pub is_home: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamFixtureRow {
    pub team_id: u32,
    pub team_short: String,
    pub team_name: String,
    pub cells: Vec<FixtureCell>,
    pub total_difficulty: u32,
    pub average_difficulty: f64,
    /// Sum of `gameweek_difficulty` over every gameweek in range, blanks included.
    pub effective_difficulty: f64,
    pub blank_gameweeks: Vec<u8>,
    pub double_gameweeks: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SwingKind {
    GoodRunStarting,
    DifficultySpike,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixtureSwing {
    pub team_id: u32,
    pub team_short: String,
    pub kind: SwingKind,
    /// First gameweek of the new run.
    pub starts_at: u8,
    pub before_average: f64,
    pub after_average: f64,
    pub delta: f64,
}

/// Per-team fixture rows for `gw_start..=gw_end` (clamped to the season).
pub fn build_fixture_grid(
    teams: &[Team],
    fixtures: &[Fixture],
    gw_start: u8,
    gw_end: u8,
) -> Vec<TeamFixtureRow> {
    let start = gw_start.max(FIRST_GAMEWEEK);
    let end = gw_end.min(LAST_GAMEWEEK);
    let short_names: BTreeMap<u32, &str> =
        teams.iter().map(|t| (t.id, t.short_name.as_str())).collect();

    let mut in_range: Vec<&Fixture> = fixtures
        .iter()
        .filter(|f| f.gameweek.is_some_and(|gw| gw >= start && gw <= end))
        .collect();
    in_range.sort_by(|a, b| {
        a.gameweek
            .cmp(&b.gameweek)
            .then(a.kickoff_time.cmp(&b.kickoff_time))
            .then(a.id.cmp(&b.id))
    });

    teams
        .iter()
        .map(|team| {
            let cells: Vec<FixtureCell> = in_range
                .iter()
                .filter_map(|f| {
                    let side = f.side_for(team.id)?;
                    Some(FixtureCell {
                        gameweek: f.gameweek?,
                        opponent_id: side.opponent_id,
                        opponent_short: short_names
                            .get(&side.opponent_id)
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| crate::enrich::UNKNOWN_TEAM.to_string()),
                        difficulty: side.difficulty,
                        is_home: side.is_home,
                    })
                })
                .collect();

            let mut per_gameweek: BTreeMap<u8, Vec<FixtureSide>> = BTreeMap::new();
            for cell in &cells {
                per_gameweek.entry(cell.gameweek).or_default().push(FixtureSide {
                    opponent_id: cell.opponent_id,
                    difficulty: cell.difficulty,
                    is_home: cell.is_home,
                });
            }
            let in_window: Vec<u8> = if start <= end {
                (start..=end).collect()
            } else {
                Vec::new()
            };
            let blank_gameweeks = in_window
                .iter()
                .copied()
                .filter(|gw| !per_gameweek.contains_key(gw))
                .collect();
            let double_gameweeks = per_gameweek
                .iter()
                .filter(|(_, sides)| sides.len() > 1)
                .map(|(gw, _)| *gw)
                .collect();
            let effective_difficulty: f64 = in_window
                .iter()
                .map(|gw| {
                    let sides = per_gameweek.get(gw).map(Vec::as_slice).unwrap_or(&[]);
                    gameweek_difficulty(sides)
                })
                .sum();

            let total_difficulty: u32 = cells.iter().map(|c| u32::from(c.difficulty)).sum();
            let average_difficulty = if cells.is_empty() {
                0.0
            } else {
                round2(f64::from(total_difficulty) / cells.len() as f64)
            };

            TeamFixtureRow {
                team_id: team.id,
                team_short: team.short_name.clone(),
                team_name: team.name.clone(),
                cells,
                total_difficulty,
                average_difficulty,
                effective_difficulty: round2(effective_difficulty),
                blank_gameweeks,
                double_gameweeks,
            }
        })
        .collect()
}

/// Easiest run first: lower effective difficulty (each blank costs
/// `BLANK_GAMEWEEK_DIFFICULTY`), then more fixtures, then name.
/// Teams without a single fixture in range go last.
pub fn sort_by_easiest_fixtures(rows: &mut [TeamFixtureRow]) {
    rows.sort_by(|a, b| {
        a.cells
            .is_empty()
            .cmp(&b.cells.is_empty())
            .then(a.effective_difficulty.total_cmp(&b.effective_difficulty))
            .then(b.cells.len().cmp(&a.cells.len()))
            .then(a.team_short.cmp(&b.team_short))
    });
}

/// Effective difficulty of one gameweek for one team.
pub fn gameweek_difficulty(sides: &[FixtureSide]) -> f64 {
    match sides.len() {
        0 => BLANK_GAMEWEEK_DIFFICULTY,
        1 => f64::from(sides[0].difficulty),
        n => {
            let mean = sides.iter().map(|s| f64::from(s.difficulty)).sum::<f64>() / n as f64;
            (mean - DOUBLE_GAMEWEEK_BONUS).max(1.0)
        }
    }
}

/// Find teams whose difficulty changes sharply around some gameweek.
///
/// For every split `s` in `start_gw..=start_gw + window`, compares the mean
/// difficulty of the `window` gameweeks before `s` with the `window`
/// gameweeks from `s` on. The split with the largest |delta| wins (earliest
/// on ties) and becomes a swing when |delta| reaches `SWING_THRESHOLD`.
pub fn analyze_fixture_swings(
    teams: &[Team],
    fixtures: &[Fixture],
    start_gw: u8,
    window: u8,
) -> Vec<FixtureSwing> {
    if window == 0 {
        return Vec::new();
    }

    let mut swings: Vec<FixtureSwing> = teams
        .iter()
        .filter_map(|team| {
            let series = difficulty_series(fixtures, team.id);
            let best = best_split(&series, start_gw, window)?;
            if best.delta.abs() < SWING_THRESHOLD {
                return None;
            }
            let kind = if best.delta < 0.0 {
                SwingKind::GoodRunStarting
            } else {
                SwingKind::DifficultySpike
            };
            Some(FixtureSwing {
                team_id: team.id,
                team_short: team.short_name.clone(),
                kind,
                starts_at: best.split,
                before_average: round2(best.before),
                after_average: round2(best.after),
                delta: round2(best.delta),
            })
        })
        .collect();

    swings.sort_by(|a, b| {
        b.delta
            .abs()
            .total_cmp(&a.delta.abs())
            .then(a.team_id.cmp(&b.team_id))
    });
    swings
}

#[derive(Debug, Clone, Copy)]
struct Split {
    split: u8,
    before: f64,
    after: f64,
    delta: f64,
}

/// Difficulty for every gameweek of the season, indexed by gameweek id.
fn difficulty_series(fixtures: &[Fixture], team_id: u32) -> BTreeMap<u8, f64> {
    let mut sides: BTreeMap<u8, Vec<FixtureSide>> = BTreeMap::new();
    for fixture in fixtures {
        let Some(gw) = fixture.gameweek else { continue };
        if let Some(side) = fixture.side_for(team_id) {
            sides.entry(gw).or_default().push(side);
        }
    }
    (FIRST_GAMEWEEK..=LAST_GAMEWEEK)
        .map(|gw| {
            let played = sides.get(&gw).map(Vec::as_slice).unwrap_or(&[]);
            (gw, gameweek_difficulty(played))
        })
        .collect()
}

fn window_mean(series: &BTreeMap<u8, f64>, from: i32, to: i32) -> Option<f64> {
    let lo = from.max(i32::from(FIRST_GAMEWEEK));
    let hi = to.min(i32::from(LAST_GAMEWEEK));
    if lo > hi {
        return None;
    }
    let values: Vec<f64> = (lo..=hi)
        .filter_map(|gw| series.get(&(gw as u8)).copied())
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn best_split(series: &BTreeMap<u8, f64>, start_gw: u8, window: u8) -> Option<Split> {
    let window = i32::from(window);
    let start = i32::from(start_gw);
    let mut best: Option<Split> = None;
    for split in start..=start + window {
        let Some(before) = window_mean(series, split - window, split - 1) else {
            continue;
        };
        let Some(after) = window_mean(series, split, split + window - 1) else {
            continue;
        };
        let delta = after - before;
        let better = match best {
            None => true,
            Some(current) => delta.abs() > current.delta.abs(),
        };
        if better {
            best = Some(Split {
                split: split as u8,
                before,
                after,
                delta,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(difficulty: u8) -> FixtureSide {
        FixtureSide {
            opponent_id: 2,
            difficulty,
            is_home: true,
        }
    }

    #[test]
    fn blank_and_double_gameweeks_are_weighted() {
        assert_eq!(gameweek_difficulty(&[]), BLANK_GAMEWEEK_DIFFICULTY);
        assert_eq!(gameweek_difficulty(&[side(4)]), 4.0);
        assert_eq!(gameweek_difficulty(&[side(2), side(4)]), 2.5);
        assert_eq!(gameweek_difficulty(&[side(1), side(1)]), 1.0);
    }

    #[test]
    fn earliest_split_wins_ties() {
        // 5,5,1,1,5,5: splits at 3 and 5 both have |delta| 4 with window 2.
        let series: BTreeMap<u8, f64> = [5.0, 5.0, 1.0, 1.0, 5.0, 5.0]
            .iter()
            .enumerate()
            .map(|(i, d)| ((i + 1) as u8, *d))
            .collect();
        let best = best_split(&series, 3, 2).expect("split");
        assert_eq!(best.split, 3);
        assert_eq!(best.delta, -4.0);
    }
}

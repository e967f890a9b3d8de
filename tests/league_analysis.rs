use std::collections::HashMap;

use fpl_insights::enrich::{PlayerMap, TeamMap, UNKNOWN_TEAM};
use fpl_insights::league_analysis::{
    UserRelation, analyze_league, compare_with_rival, compare_with_rivals, select_rivals,
};
use fpl_insights::model::{Chip, ChipUsage, Fetched, LeagueStanding, Pick, RivalTeam, Squad};
use fpl_insights::rival_chips::{analyze_rival_chips, available_chips, chip_available};

fn squad(ids: &[u32], captain: u32) -> Squad {
    let picks = ids
        .iter()
        .enumerate()
        .map(|(idx, id)| {
            let slot = idx as u8 + 1;
            let is_captain = *id == captain;
            Pick {
                player_id: *id,
                slot,
                multiplier: if is_captain {
                    2
                } else if slot <= 11 {
                    1
                } else {
                    0
                },
                is_captain,
                is_vice_captain: false,
            }
        })
        .collect();
    Squad {
        picks,
        active_chip: None,
    }
}

fn standing(manager_id: u64, rank: u32, total: i64) -> LeagueStanding {
    LeagueStanding {
        manager_id,
        entry_name: format!("Team {manager_id}"),
        player_name: format!("Manager {manager_id}"),
        rank,
        total_points: total,
        event_total: 50,
    }
}

fn failed() -> Fetched<Squad> {
    Fetched::Failed {
        reason: "HTTP 503".to_string(),
    }
}

#[test]
fn compares_shared_and_exclusive_players() {
    let user_ids: Vec<u32> = (1..=15).collect();
    let rival_ids: Vec<u32> = (1..=6).chain(16..=24).collect();
    let user = squad(&user_ids, 7);
    let rival = RivalTeam::new(
        standing(2, 3, 210),
        200,
        Fetched::Loaded(squad(&rival_ids, 16)),
    );

    let cmp = compare_with_rival(&user, &rival).expect("loaded rival");
    assert_eq!(cmp.shared, (1..=6).collect::<Vec<u32>>());
    assert_eq!(cmp.user_only.len(), 9);
    assert_eq!(cmp.rival_only.len(), 9);
    assert_eq!(cmp.rival_only[0], 16);
    assert!(!cmp.captain_match);
    assert_eq!(cmp.user_captain, Some(7));
    assert_eq!(cmp.rival_captain, Some(16));
    assert_eq!(cmp.points_gap, 10);
}

#[test]
fn failed_rivals_are_not_compared() {
    let user = squad(&[1, 2, 3], 1);
    let rivals = vec![
        RivalTeam::new(standing(2, 1, 100), 90, failed()),
        RivalTeam::new(standing(3, 2, 95), 90, Fetched::Loaded(squad(&[1, 4], 1))),
    ];
    let cmps = compare_with_rivals(&user, &rivals);
    assert_eq!(cmps.len(), 1);
    assert_eq!(cmps[0].manager_id, 3);
    assert!(cmps[0].captain_match);
}

#[test]
fn selects_nearest_rivals_by_rank() {
    let standings: Vec<LeagueStanding> = (1..=50u32)
        .map(|rank| standing(u64::from(rank), rank, 1000 - i64::from(rank) * 5))
        .collect();
    let picked = select_rivals(&standings, 10, 5);
    let ids: Vec<u64> = picked.iter().map(|s| s.manager_id).collect();
    assert_eq!(ids, vec![7, 8, 9, 11, 12]);
}

#[test]
fn absent_user_gets_the_leaders() {
    let standings: Vec<LeagueStanding> = (1..=8u32)
        .map(|rank| standing(u64::from(rank) + 100, rank, 500))
        .collect();
    let picked = select_rivals(&standings, 9999, 3);
    let ranks: Vec<u32> = picked.iter().map(|s| s.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[test]
fn rival_count_larger_than_league() {
    let standings = vec![standing(1, 1, 100), standing(2, 2, 90)];
    let picked = select_rivals(&standings, 2, 10);
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].manager_id, 1);
}

#[test]
fn partial_sample_excludes_failed_rivals() {
    // Player 100 owned by every loaded rival, captained by one.
    let user = squad(&[1, 2, 3, 4], 1);
    let user_standing = standing(10, 5, 200);
    let mut rivals = Vec::new();
    for i in 0..10u64 {
        let fetched = if i < 3 {
            let captain = if i == 0 { 100 } else { 2 };
            Fetched::Loaded(squad(&[100, 2, 50 + i as u32], captain))
        } else {
            failed()
        };
        rivals.push(RivalTeam::new(standing(20 + i, 6 + i as u32, 190), 200, fetched));
    }

    let analysis = analyze_league(
        &user,
        &user_standing,
        &rivals,
        240,
        &PlayerMap::new(),
        &TeamMap::new(),
    );
    assert_eq!(analysis.requested_rivals, 10);
    assert_eq!(analysis.sample_size, 3);
    assert_eq!(analysis.failed_managers.len(), 7);
    assert_eq!(analysis.points_to_leader, 40);
    assert_eq!(analysis.average_rank_gap, 10.0);

    let row = analysis
        .effective_ownership
        .iter()
        .find(|r| r.player_id == 100)
        .expect("template player");
    assert_eq!(row.rival_owners, 3);
    assert_eq!(row.rival_captains, 1);
    assert_eq!(row.league_ownership, 100.0);
    assert_eq!(row.effective_ownership, 133.33);
    assert_eq!(row.user_relation, UserRelation::NotOwned);
    assert_eq!(row.web_name, "Unknown #100");
    assert_eq!(row.team_short, UNKNOWN_TEAM);
    for r in &analysis.effective_ownership {
        assert!((0.0..=100.0).contains(&r.league_ownership));
        assert_eq!(r.sample_size, 3);
    }

    assert!(
        analysis
            .cover_differentials
            .iter()
            .any(|d| d.player_id == 100)
    );
    let swing = analysis
        .swing_scenarios
        .iter()
        .find(|s| s.player_id == 100)
        .expect("swing for template player");
    assert_eq!(swing.rivals_owning, 3);
    assert_eq!(swing.rivals_not_owning, 0);
    let ten = swing
        .outcomes
        .iter()
        .find(|o| o.hypothetical_points == 10)
        .expect("10 point outcome");
    assert_eq!(ten.net_points, 30);
    assert_eq!(ten.rank_gap_units, 3.0);

    // Owned by nobody else and started by the user.
    assert!(
        analysis
            .attack_differentials
            .iter()
            .any(|d| d.player_id == 3 && d.rival_owners == 0)
    );
    let captaincy = &analysis.rival_captaincy;
    assert_eq!(captaincy[0].player_id, 2);
    assert_eq!(captaincy[0].rivals, 2);
}

#[test]
fn empty_sample_yields_empty_results() {
    let user = squad(&[1, 2, 3], 1);
    let rivals = vec![
        RivalTeam::new(standing(2, 1, 300), 250, failed()),
        RivalTeam::new(standing(3, 3, 240), 250, failed()),
    ];
    let analysis = analyze_league(
        &user,
        &standing(1, 2, 250),
        &rivals,
        300,
        &PlayerMap::new(),
        &TeamMap::new(),
    );
    assert_eq!(analysis.sample_size, 0);
    assert_eq!(analysis.failed_managers, vec![2, 3]);
    assert!(analysis.effective_ownership.is_empty());
    assert!(analysis.attack_differentials.is_empty());
    assert!(analysis.cover_differentials.is_empty());
    assert!(analysis.swing_scenarios.is_empty());
}

#[test]
fn chips_reset_at_the_halfway_point() {
    let used = vec![ChipUsage {
        chip: Chip::Wildcard,
        gameweek: 5,
    }];
    assert!(!chip_available(&used, Chip::Wildcard, 12));
    assert!(chip_available(&used, Chip::Wildcard, 20));
    assert!(chip_available(&used, Chip::BenchBoost, 12));
    assert_eq!(available_chips(&used, 12).len(), 3);

    let late = vec![ChipUsage {
        chip: Chip::FreeHit,
        gameweek: 22,
    }];
    assert!(!chip_available(&late, Chip::FreeHit, 25));
    assert!(chip_available(&late, Chip::FreeHit, 19));
}

#[test]
fn rival_chip_alerts_and_failures() {
    let rivals = vec![
        RivalTeam::new(standing(2, 1, 310), 300, Fetched::Loaded(squad(&[1], 1))),
        RivalTeam::new(standing(3, 3, 290), 300, Fetched::Loaded(squad(&[1], 1))),
    ];
    let mut history = HashMap::new();
    history.insert(
        2,
        Fetched::Loaded(vec![ChipUsage {
            chip: Chip::TripleCaptain,
            gameweek: 11,
        }]),
    );
    history.insert(
        3,
        Fetched::Failed {
            reason: "timeout".to_string(),
        },
    );
    let user_used = vec![ChipUsage {
        chip: Chip::BenchBoost,
        gameweek: 3,
    }];

    let analysis = analyze_rival_chips(&user_used, &rivals, &history, 300, 12);
    assert_eq!(analysis.sample_size, 1);
    assert_eq!(analysis.failed_managers, vec![3]);
    assert_eq!(analysis.alerts.len(), 1);
    assert_eq!(analysis.alerts[0].chip, Chip::TripleCaptain);
    assert_eq!(analysis.alerts[0].gameweeks_ago, 1);
    assert!(!analysis.user_available.contains(&Chip::BenchBoost));

    let threat = analysis.threats.first().expect("rival still holds bench boost");
    assert_eq!(threat.manager_id, 2);
    assert_eq!(threat.chips, vec![Chip::BenchBoost]);
    assert!(analysis.advantages[0].user_available);
}

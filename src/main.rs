use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fpl_insights::assistant_context::{build_optimizer_context, render_prompt, system_prompt};
use fpl_insights::captain::{CaptainPick, score_captain_options};
use fpl_insights::config::AppConfig;
use fpl_insights::enrich::{build_team_map, enrich_players, player_map};
use fpl_insights::fake_league::demo_league;
use fpl_insights::fixture_planner::{
    FixtureSwing, TeamFixtureRow, analyze_fixture_swings, build_fixture_grid,
    sort_by_easiest_fixtures,
};
use fpl_insights::fpl_fetch::{FplClient, load_snapshot};
use fpl_insights::gameweek::GameweekContext;
use fpl_insights::http_cache::ResponseCache;
use fpl_insights::league_analysis::{
    LeagueAnalysis, RivalComparison, analyze_league, compare_with_rivals, select_rivals,
};
use fpl_insights::league_fetch::{SquadSource, fetch_rival_chips, fetch_rival_squads, rival_teams};
use fpl_insights::model::{
    BootstrapSnapshot, FIRST_GAMEWEEK, Fixture, LAST_GAMEWEEK, LeagueStanding, is_valid_gameweek,
};
use fpl_insights::predict::{TransferQuery, TransferRecommendation, score_transfer_targets};
use fpl_insights::price_change::{PriceChangeForecast, predict_price_changes};
use fpl_insights::rival_chips::{RivalChipAnalysis, analyze_rival_chips};

const DEMO_SEED: u64 = 2025;
const DEMO_MANAGERS: usize = 50;
const DEMO_GAMEWEEK: u8 = 12;
const FIXTURE_HORIZON: u8 = 5;
const REPORT_ROWS: usize = 10;

#[derive(Debug, Default)]
struct CliArgs {
    league_id: Option<u64>,
    manager_id: Option<u64>,
    gameweek: Option<u8>,
    rivals: Option<usize>,
    seed: Option<u64>,
    demo: bool,
    json: bool,
    prompt: bool,
}

struct SeasonData {
    bootstrap: BootstrapSnapshot,
    fixtures: Vec<Fixture>,
    standings: Vec<LeagueStanding>,
    user_manager_id: u64,
}

#[derive(Debug, Serialize)]
struct LeagueReport {
    gameweek: u8,
    planning_gameweek: u8,
    hours_to_deadline: Option<f64>,
    league: LeagueAnalysis,
    comparisons: Vec<RivalComparison>,
    chips: RivalChipAnalysis,
    captains: Vec<CaptainPick>,
    transfers: Vec<TransferRecommendation>,
    price_changes: PriceChangeForecast,
    fixtures: Vec<TeamFixtureRow>,
    swings: Vec<FixtureSwing>,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env();
    let args = parse_args(std::env::args().skip(1))?;
    let rival_count = args.rivals.unwrap_or(config.rival_count).clamp(1, 50);

    if args.demo {
        let league = demo_league(
            args.seed.unwrap_or(DEMO_SEED),
            DEMO_MANAGERS,
            args.gameweek.unwrap_or(DEMO_GAMEWEEK),
        );
        // Every 17th manager from rank 4 fails to load.
        let failing: Vec<u64> = league
            .standings
            .iter()
            .skip(3)
            .step_by(17)
            .map(|s| s.manager_id)
            .collect();
        let source = league.source(&failing);
        let season = SeasonData {
            bootstrap: league.bootstrap,
            fixtures: league.fixtures,
            standings: league.standings,
            user_manager_id: league.user_manager_id,
        };
        return run(&source, season, &args, rival_count, config.fetch_parallelism);
    }

    let (Some(league_id), Some(manager_id)) = (args.league_id, args.manager_id) else {
        bail!("usage: fpl_insights --league=<id> --manager=<id> [--gw=N] [--rivals=N] [--json] [--prompt] | --demo");
    };
    let cache = Arc::new(ResponseCache::new(config.cache.clone()));
    let client = FplClient::new(&config, cache)?;
    let (bootstrap, fixtures) = load_snapshot(&client)?;
    let standings = client
        .league_standings(league_id)
        .with_context(|| format!("standings for league {league_id} failed"))?;
    info!(league_id, managers = standings.len(), "loaded league standings");
    let season = SeasonData {
        bootstrap,
        fixtures,
        standings,
        user_manager_id: manager_id,
    };
    run(&client, season, &args, rival_count, config.fetch_parallelism)
}

fn run<S>(
    source: &S,
    season: SeasonData,
    args: &CliArgs,
    rival_count: usize,
    parallelism: usize,
) -> Result<()>
where
    S: SquadSource + Sync,
{
    let gw_ctx = GameweekContext::from_events(&season.bootstrap.gameweeks)
        .context("bootstrap gameweeks are inconsistent")?;
    let gameweek = args
        .gameweek
        .or_else(|| gw_ctx.current_id())
        .unwrap_or_else(|| gw_ctx.planning_gameweek());
    let planning_gameweek = gw_ctx.planning_gameweek();

    let players = enrich_players(&season.bootstrap);
    let players_by_id = player_map(&players);
    let team_map = build_team_map(&season.bootstrap.teams);

    let Some(user_standing) = season
        .standings
        .iter()
        .find(|s| s.manager_id == season.user_manager_id)
        .cloned()
    else {
        bail!(
            "manager {} is not in the league standings",
            season.user_manager_id
        );
    };
    let leader_total = season
        .standings
        .first()
        .map(|s| s.total_points)
        .unwrap_or(user_standing.total_points);

    let user_squad = source
        .fetch_squad(season.user_manager_id, gameweek)
        .with_context(|| format!("picks for manager {} failed", season.user_manager_id))?;
    let user_chips = source
        .fetch_chip_history(season.user_manager_id)
        .unwrap_or_else(|err| {
            warn!(error = %err, "user chip history unavailable");
            Vec::new()
        });

    let selected = select_rivals(&season.standings, season.user_manager_id, rival_count);
    let rival_ids: Vec<u64> = selected.iter().map(|s| s.manager_id).collect();
    let squads = fetch_rival_squads(source, &rival_ids, gameweek, parallelism);
    let rivals = rival_teams(&selected, user_standing.total_points, squads);
    let chip_history: HashMap<_, _> = fetch_rival_chips(source, &rival_ids, parallelism)
        .into_iter()
        .collect();

    let league = analyze_league(
        &user_squad,
        &user_standing,
        &rivals,
        leader_total,
        &players_by_id,
        &team_map,
    );
    let comparisons = compare_with_rivals(&user_squad, &rivals);
    let chips = analyze_rival_chips(
        &user_chips,
        &rivals,
        &chip_history,
        user_standing.total_points,
        gameweek,
    );

    let captains: Vec<CaptainPick> =
        score_captain_options(&players, &season.fixtures, &team_map, planning_gameweek)
            .into_iter()
            .filter(|pick| user_squad.pick_for(pick.player_id).is_some())
            .collect();
    let transfers = score_transfer_targets(
        &players,
        &season.fixtures,
        &TransferQuery {
            start_gameweek: planning_gameweek,
            horizon: FIXTURE_HORIZON,
            exclude: user_squad.player_ids().into_iter().collect(),
            limit: Some(REPORT_ROWS),
            ..TransferQuery::default()
        },
    );
    let horizon_end = planning_gameweek
        .saturating_add(FIXTURE_HORIZON - 1)
        .min(LAST_GAMEWEEK);
    let mut grid = build_fixture_grid(
        &season.bootstrap.teams,
        &season.fixtures,
        planning_gameweek,
        horizon_end,
    );
    sort_by_easiest_fixtures(&mut grid);
    let swings = analyze_fixture_swings(
        &season.bootstrap.teams,
        &season.fixtures,
        planning_gameweek,
        FIXTURE_HORIZON,
    );

    if args.prompt {
        let ctx = build_optimizer_context(
            planning_gameweek,
            &user_squad,
            &players_by_id,
            &captains,
            &transfers,
            Some(&league),
        );
        println!("{}\n", system_prompt());
        println!("{}", render_prompt(&ctx));
        return Ok(());
    }

    let report = LeagueReport {
        gameweek,
        planning_gameweek,
        hours_to_deadline: gw_ctx.hours_until_deadline(Utc::now()),
        league,
        comparisons,
        chips,
        captains,
        transfers,
        price_changes: predict_price_changes(&players),
        fixtures: grid,
        swings,
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("report serialization failed")?
        );
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &LeagueReport) {
    let league = &report.league;
    println!("Gameweek {} (planning GW{})", report.gameweek, report.planning_gameweek);
    if let Some(hours) = report.hours_to_deadline {
        println!("Deadline in {hours:.1}h");
    }
    println!(
        "Rank {} | {} pts | {} behind leader | {}/{} rivals loaded",
        league.user_rank,
        league.user_total,
        league.points_to_leader,
        league.sample_size,
        league.requested_rivals
    );
    if !league.failed_managers.is_empty() {
        println!("Failed managers: {:?}", league.failed_managers);
    }

    println!("\nEffective ownership");
    for row in league.effective_ownership.iter().take(REPORT_ROWS) {
        println!(
            " {:<14} {:<4} EO {:>6.1}% league {:>5.1}% gap {:>+6.2}",
            row.web_name, row.team_short, row.effective_ownership, row.league_ownership, row.eo_gap
        );
    }

    println!("\nAttack differentials");
    for row in &league.attack_differentials {
        println!(
            " {:<14} {:<4} rivals {:>5.1}% form {:.1}",
            row.web_name, row.team_short, row.rival_ownership, row.form
        );
    }
    println!("\nCover threats");
    for scenario in &league.swing_scenarios {
        let outcomes = scenario
            .outcomes
            .iter()
            .map(|o| format!("{}pts:{:+}", o.hypothetical_points, o.net_points))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            " {:<14} {}/{} rivals | {}",
            scenario.web_name,
            scenario.rivals_owning,
            scenario.rivals_owning + scenario.rivals_not_owning,
            outcomes
        );
    }

    println!("\nRivals");
    for cmp in &report.comparisons {
        println!(
            " {:<18} gap {:>+5} shared {:>2} theirs {:>2} captain {}",
            cmp.entry_name,
            cmp.points_gap,
            cmp.shared.len(),
            cmp.rival_only.len(),
            if cmp.captain_match { "same" } else { "different" }
        );
    }

    println!("\nChips");
    let available = report
        .chips
        .user_available
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ");
    println!(" Available: {available}");
    for alert in &report.chips.alerts {
        println!(
            " {} played {} in GW{}",
            alert.entry_name,
            alert.chip.label(),
            alert.gameweek
        );
    }

    println!("\nCaptain options");
    for pick in report.captains.iter().take(5) {
        println!(
            " {:<14} {:<4} {:>6.2} {:?}",
            pick.web_name, pick.team_short, pick.composite, pick.tag
        );
    }

    println!("\nTransfer targets");
    for target in &report.transfers {
        println!(
            " {:<3} {:<14} {:<4} £{:.1}m score {:.2}",
            target.position.label(),
            target.web_name,
            target.team_short,
            target.price,
            target.score
        );
    }

    println!("\nPrice changes");
    for change in report.price_changes.rises.iter().take(5) {
        println!(" ▲ {:<14} {:.0}%", change.web_name, change.probability * 100.0);
    }
    for change in report.price_changes.falls.iter().take(5) {
        println!(" ▼ {:<14} {:.0}%", change.web_name, change.probability * 100.0);
    }

    println!("\nEasiest fixtures");
    for row in report.fixtures.iter().take(5) {
        let cells = row
            .cells
            .iter()
            .map(|c| format!("{}{}", c.opponent_short, if c.is_home { "(H)" } else { "(A)" }))
            .collect::<Vec<_>>()
            .join(" ");
        println!(" {:<4} {:>5.1} {}", row.team_short, row.effective_difficulty, cells);
    }
    for swing in &report.swings {
        println!(
            " {:<4} {:?} from GW{} ({:+.2})",
            swing.team_short, swing.kind, swing.starts_at, swing.delta
        );
    }
}

fn parse_args<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut out = CliArgs::default();
    for arg in args {
        if let Some(raw) = arg.strip_prefix("--league=") {
            out.league_id = raw.trim().parse().ok();
        } else if let Some(raw) = arg.strip_prefix("--manager=") {
            out.manager_id = raw.trim().parse().ok();
        } else if let Some(raw) = arg.strip_prefix("--gw=") {
            match raw.trim().parse::<u8>() {
                Ok(gw) if is_valid_gameweek(gw) => out.gameweek = Some(gw),
                _ => bail!(
                    "--gw must be a gameweek in {FIRST_GAMEWEEK}..={LAST_GAMEWEEK}, got {raw:?}"
                ),
            }
        } else if let Some(raw) = arg.strip_prefix("--rivals=") {
            out.rivals = raw.trim().parse().ok();
        } else if let Some(raw) = arg.strip_prefix("--seed=") {
            out.seed = raw.trim().parse().ok();
        } else if arg == "--demo" {
            out.demo = true;
        } else if arg == "--json" {
            out.json = true;
        } else if arg == "--prompt" {
            out.prompt = true;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reads_flags() {
        let parsed = parse_args(args(&["--league=314", "--manager=7", "--gw=12", "--json"]))
            .expect("valid args");
        assert_eq!(parsed.league_id, Some(314));
        assert_eq!(parsed.manager_id, Some(7));
        assert_eq!(parsed.gameweek, Some(12));
        assert!(parsed.json);
        assert!(!parsed.demo);
    }

    #[test]
    fn rejects_out_of_season_gameweek() {
        for bad in ["--gw=0", "--gw=39", "--gw=45", "--gw=abc"] {
            assert!(parse_args(args(&["--demo", bad])).is_err(), "{bad} accepted");
        }
        let edge = parse_args(args(&["--gw=38"])).expect("last gameweek");
        assert_eq!(edge.gameweek, Some(38));
    }
}

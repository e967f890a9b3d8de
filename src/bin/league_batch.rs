use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use fpl_insights::config::AppConfig;
use fpl_insights::fake_league::demo_league;
use fpl_insights::fpl_fetch::FplClient;
use fpl_insights::http_cache::ResponseCache;
use fpl_insights::league_fetch::{LeagueBatchRequest, run_league_batch};

// Reads a batch request as JSON from `--request=<json>` or stdin and prints
// the response JSON. `--demo` answers from a seeded synthetic league.
fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let demo = args.iter().any(|a| a == "--demo");

    let raw = match args.iter().find_map(|a| a.strip_prefix("--request=")) {
        Some(inline) => inline.to_string(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read request from stdin")?;
            buf
        }
    };
    let request: LeagueBatchRequest =
        serde_json::from_str(raw.trim()).context("request is not valid JSON")?;

    let response = if demo {
        let league = demo_league(2025, 50, request.gameweek);
        let source = league.source(&[]);
        run_league_batch(&source, &request, config.fetch_parallelism)?
    } else {
        let cache = Arc::new(ResponseCache::new(config.cache.clone()));
        let client = FplClient::new(&config, cache)?;
        run_league_batch(&client, &request, config.fetch_parallelism)?
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    eprintln!(
        "picks: {} ok, {} failed",
        response.stats.successful_picks, response.stats.failed_picks
    );
    Ok(())
}

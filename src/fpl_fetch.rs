use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::http_cache::{CacheCategory, ResponseCache};
use crate::http_client::http_client;
use crate::league_fetch::SquadSource;
use crate::model::{BootstrapSnapshot, ChipUsage, Fixture, LeagueStanding, ManagerHistory, Squad};

/// Standings pages fetched at most; 50 managers per page upstream.
pub const MAX_STANDINGS_PAGES: u32 = 20;

#[derive(Debug, Clone, Default)]
pub struct StandingsPage {
    pub league_name: String,
    pub page: u32,
    pub has_next: bool,
    pub results: Vec<LeagueStanding>,
}

/// Read-only client for the public fantasy API, backed by a `ResponseCache`.
pub struct FplClient {
    client: &'static Client,
    api_base: String,
    cache: Arc<ResponseCache>,
}

impl FplClient {
    pub fn new(config: &AppConfig, cache: Arc<ResponseCache>) -> Result<Self> {
        let client = http_client(config.request_timeout)?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            cache,
        })
    }

    pub fn bootstrap(&self) -> Result<BootstrapSnapshot, FetchError> {
        let body = self.get_json("bootstrap-static/", CacheCategory::Bootstrap)?;
        parse_bootstrap_json(&body)
    }

    pub fn fixtures(&self) -> Result<Vec<Fixture>, FetchError> {
        let body = self.get_json("fixtures/", CacheCategory::Fixtures)?;
        parse_fixtures_json(&body)
    }

    pub fn standings_page(&self, league_id: u64, page: u32) -> Result<StandingsPage, FetchError> {
        let path = format!("leagues-classic/{league_id}/standings/?page_standings={page}");
        let body = self.get_json(&path, CacheCategory::Standings)?;
        parse_standings_json(&body)
    }

    /// Walks standings pages until upstream reports no more (or the page cap).
    pub fn league_standings(&self, league_id: u64) -> Result<Vec<LeagueStanding>, FetchError> {
        let mut pages = Vec::new();
        let mut page = 1u32;
        loop {
            let chunk = self.standings_page(league_id, page)?;
            let has_next = chunk.has_next;
            pages.push(chunk.results);
            if !has_next || page >= MAX_STANDINGS_PAGES {
                break;
            }
            page += 1;
        }
        Ok(merge_standings_pages(pages))
    }

    pub fn manager_picks(&self, manager_id: u64, gameweek: u8) -> Result<Squad, FetchError> {
        let path = format!("entry/{manager_id}/event/{gameweek}/picks/");
        let body = self.get_json(&path, CacheCategory::Picks)?;
        parse_picks_json(&body)
    }

    pub fn manager_history(&self, manager_id: u64) -> Result<ManagerHistory, FetchError> {
        let path = format!("entry/{manager_id}/history/");
        let body = self.get_json(&path, CacheCategory::History)?;
        parse_history_json(&body)
    }

    fn get_json(&self, path: &str, category: CacheCategory) -> Result<String, FetchError> {
        let url = format!("{}/{}", self.api_base, path);
        self.cache.get_or_fetch(&url, category, || {
            debug!(%url, "fetching upstream");
            let resp = self.client.get(&url).send()?;
            let status = resp.status();
            if !status.is_success() {
                warn!(%url, status = status.as_u16(), "upstream request failed");
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url: url.clone(),
                });
            }
            let body = resp.text()?;
            if body.trim().is_empty() {
                return Err(FetchError::Empty(url.clone()));
            }
            Ok(body)
        })
    }
}

impl SquadSource for FplClient {
    fn fetch_squad(&self, manager_id: u64, gameweek: u8) -> Result<Squad, FetchError> {
        self.manager_picks(manager_id, gameweek)
    }

    fn fetch_chip_history(&self, manager_id: u64) -> Result<Vec<ChipUsage>, FetchError> {
        Ok(self.manager_history(manager_id)?.chip_usages())
    }
}

pub fn parse_bootstrap_json(raw: &str) -> Result<BootstrapSnapshot, FetchError> {
    let trimmed = non_null(raw, "bootstrap-static")?;
    Ok(serde_json::from_str(trimmed)?)
}

/// A `null` fixtures body is read as an empty list.
pub fn parse_fixtures_json(raw: &str) -> Result<Vec<Fixture>, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}

pub fn parse_picks_json(raw: &str) -> Result<Squad, FetchError> {
    let trimmed = non_null(raw, "picks")?;
    Ok(serde_json::from_str(trimmed)?)
}

pub fn parse_history_json(raw: &str) -> Result<ManagerHistory, FetchError> {
    let trimmed = non_null(raw, "history")?;
    Ok(serde_json::from_str(trimmed)?)
}

#[derive(Debug, Deserialize)]
struct StandingsResponse {
    #[serde(default)]
    league: Option<StandingsLeague>,
    standings: StandingsBlock,
}

#[derive(Debug, Deserialize)]
struct StandingsLeague {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct StandingsBlock {
    #[serde(default)]
    has_next: bool,
    #[serde(default = "first_page")]
    page: u32,
    #[serde(default)]
    results: Vec<LeagueStanding>,
}

fn first_page() -> u32 {
    1
}

pub fn parse_standings_json(raw: &str) -> Result<StandingsPage, FetchError> {
    let trimmed = non_null(raw, "standings")?;
    let resp: StandingsResponse = serde_json::from_str(trimmed)?;
    Ok(StandingsPage {
        league_name: resp.league.map(|l| l.name).unwrap_or_default(),
        page: resp.standings.page,
        has_next: resp.standings.has_next,
        results: resp.standings.results,
    })
}

/// Flattens standings pages into one rank-ordered list. A manager who moved
/// between page fetches keeps the first row seen.
pub fn merge_standings_pages<I>(pages: I) -> Vec<LeagueStanding>
where
    I: IntoIterator<Item = Vec<LeagueStanding>>,
{
    let mut seen = HashSet::new();
    let mut out: Vec<LeagueStanding> = pages
        .into_iter()
        .flatten()
        .filter(|s| seen.insert(s.manager_id))
        .collect();
    out.sort_by(|a, b| a.rank.cmp(&b.rank).then(a.manager_id.cmp(&b.manager_id)));
    out
}

/// Loads everything the league report needs in one go.
pub fn load_snapshot(client: &FplClient) -> Result<(BootstrapSnapshot, Vec<Fixture>)> {
    let bootstrap = client.bootstrap().context("bootstrap request failed")?;
    let fixtures = client.fixtures().context("fixtures request failed")?;
    Ok((bootstrap, fixtures))
}

fn non_null<'a>(raw: &'a str, what: &str) -> Result<&'a str, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(FetchError::Empty(what.to_string()));
    }
    Ok(trimmed)
}

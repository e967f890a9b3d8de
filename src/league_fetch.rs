use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::FetchError;
use crate::model::{ChipUsage, Fetched, LeagueStanding, RivalTeam, Squad, is_valid_gameweek};

pub const MAX_BATCH_MANAGERS: usize = 50;

/// Where per-manager data comes from. The live client and the demo league
/// both implement it, and so do test stubs.
pub trait SquadSource {
    fn fetch_squad(&self, manager_id: u64, gameweek: u8) -> Result<Squad, FetchError>;
    fn fetch_chip_history(&self, manager_id: u64) -> Result<Vec<ChipUsage>, FetchError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueBatchRequest {
    pub manager_ids: Vec<u64>,
    pub gameweek: u8,
    #[serde(default)]
    pub include_chips: Option<bool>,
}

impl LeagueBatchRequest {
    /// Deduplicated manager ids in request order.
    pub fn validate(&self) -> Result<Vec<u64>, FetchError> {
        if !is_valid_gameweek(self.gameweek) {
            return Err(FetchError::InvalidRequest(format!(
                "gameweek {} outside 1..=38",
                self.gameweek
            )));
        }
        let mut seen = HashSet::new();
        let ids: Vec<u64> = self
            .manager_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        if ids.is_empty() {
            return Err(FetchError::InvalidRequest("managerIds is empty".to_string()));
        }
        if ids.len() > MAX_BATCH_MANAGERS {
            return Err(FetchError::InvalidRequest(format!(
                "{} managers requested, limit is {MAX_BATCH_MANAGERS}",
                ids.len()
            )));
        }
        Ok(ids)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerPicks {
    pub manager_id: u64,
    pub picks: Squad,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerChips {
    pub manager_id: u64,
    pub chips: Vec<ChipUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub manager_id: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub successful_picks: usize,
    pub failed_picks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueBatchResponse {
    pub rival_picks: Vec<ManagerPicks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rival_chips: Option<Vec<ManagerChips>>,
    pub stats: BatchStats,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<BatchFailure>,
}

/// Fetch every manager's squad on a bounded pool. Order follows `manager_ids`.
pub fn fetch_rival_squads<S>(
    source: &S,
    manager_ids: &[u64],
    gameweek: u8,
    parallelism: usize,
) -> Vec<(u64, Fetched<Squad>)>
where
    S: SquadSource + Sync,
{
    let results: Vec<(u64, Fetched<Squad>)> = with_fetch_pool(parallelism, || {
        manager_ids
            .par_iter()
            .map(|id| (*id, Fetched::from_result(source.fetch_squad(*id, gameweek))))
            .collect()
    });
    log_failures("picks", &results);
    results
}

pub fn fetch_rival_chips<S>(
    source: &S,
    manager_ids: &[u64],
    parallelism: usize,
) -> Vec<(u64, Fetched<Vec<ChipUsage>>)>
where
    S: SquadSource + Sync,
{
    let results: Vec<(u64, Fetched<Vec<ChipUsage>>)> = with_fetch_pool(parallelism, || {
        manager_ids
            .par_iter()
            .map(|id| (*id, Fetched::from_result(source.fetch_chip_history(*id))))
            .collect()
    });
    log_failures("chips", &results);
    results
}

/// Serve one batched league-analysis request.
pub fn run_league_batch<S>(
    source: &S,
    request: &LeagueBatchRequest,
    parallelism: usize,
) -> Result<LeagueBatchResponse, FetchError>
where
    S: SquadSource + Sync,
{
    let ids = request.validate()?;
    let squads = fetch_rival_squads(source, &ids, request.gameweek, parallelism);

    let mut stats = BatchStats::default();
    let mut rival_picks = Vec::new();
    let mut failures = Vec::new();
    for (manager_id, fetched) in squads {
        match fetched {
            Fetched::Loaded(picks) => {
                stats.successful_picks += 1;
                rival_picks.push(ManagerPicks { manager_id, picks });
            }
            Fetched::Failed { reason } => {
                stats.failed_picks += 1;
                failures.push(BatchFailure { manager_id, reason });
            }
        }
    }

    let rival_chips = if request.include_chips.unwrap_or(false) {
        let chips = fetch_rival_chips(source, &ids, parallelism)
            .into_iter()
            .filter_map(|(manager_id, fetched)| match fetched {
                Fetched::Loaded(chips) => Some(ManagerChips { manager_id, chips }),
                Fetched::Failed { .. } => None,
            })
            .collect();
        Some(chips)
    } else {
        None
    };

    info!(
        requested = ids.len(),
        successful = stats.successful_picks,
        failed = stats.failed_picks,
        "league batch complete"
    );
    Ok(LeagueBatchResponse {
        rival_picks,
        rival_chips,
        stats,
        failures,
    })
}

/// Pair each selected standing with its fetch outcome. Standings with no
/// outcome at all are marked failed rather than empty.
pub fn rival_teams(
    standings: &[LeagueStanding],
    user_total: i64,
    squads: Vec<(u64, Fetched<Squad>)>,
) -> Vec<RivalTeam> {
    let mut by_manager: HashMap<u64, Fetched<Squad>> = squads.into_iter().collect();
    standings
        .iter()
        .map(|standing| {
            let squad = by_manager
                .remove(&standing.manager_id)
                .unwrap_or_else(|| Fetched::Failed {
                    reason: "not fetched".to_string(),
                });
            RivalTeam::new(standing.clone(), user_total, squad)
        })
        .collect()
}

fn log_failures<T>(what: &str, results: &[(u64, Fetched<T>)]) {
    for (manager_id, fetched) in results {
        if let Fetched::Failed { reason } = fetched {
            warn!(manager_id, %reason, "{} fetch failed", what);
        }
    }
}

fn with_fetch_pool<T>(parallelism: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism.max(1))
        .build()
    {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::http_cache::{CacheCategory, CacheConfig};

pub const DEFAULT_API_BASE: &str = "https://fantasy.premierleague.com/api";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Upstream base URL (FPL_API_BASE).
    pub api_base: String,
    /// Concurrent manager fetches (FETCH_PARALLELISM, 2-32).
    pub fetch_parallelism: usize,
    /// Per-request timeout (REQUEST_TIMEOUT_SECS).
    pub request_timeout: Duration,
    /// Rivals sampled around the user (RIVAL_COUNT, 1-50).
    pub rival_count: usize,
    pub cache: CacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            fetch_parallelism: 6,
            request_timeout: Duration::from_secs(10),
            rival_count: 10,
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_base = env::var("FPL_API_BASE")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_base);

        let mut cache = defaults.cache;
        cache.max_entries = env_or("CACHE_MAX_ENTRIES", cache.max_entries);
        let static_ttl = env_secs("CACHE_TTL_STATIC_SECS", cache.ttl(CacheCategory::Bootstrap));
        let fixtures_ttl = env_secs("CACHE_TTL_FIXTURES_SECS", cache.ttl(CacheCategory::Fixtures));
        let live_ttl = env_secs("CACHE_TTL_LIVE_SECS", cache.ttl(CacheCategory::Live));
        let manager_ttl = env_secs("CACHE_TTL_MANAGER_SECS", cache.ttl(CacheCategory::Picks));
        for category in CacheCategory::ALL {
            let ttl = match category {
                CacheCategory::Bootstrap => static_ttl,
                CacheCategory::Fixtures => fixtures_ttl,
                CacheCategory::Live => live_ttl,
                CacheCategory::Standings | CacheCategory::Picks | CacheCategory::History => {
                    manager_ttl
                }
            };
            cache.ttl_by_category.insert(category, ttl);
        }

        Self {
            api_base,
            fetch_parallelism: env_or("FETCH_PARALLELISM", defaults.fetch_parallelism).clamp(2, 32),
            request_timeout: env_secs("REQUEST_TIMEOUT_SECS", defaults.request_timeout)
                .max(Duration::from_secs(1)),
            rival_count: env_or("RIVAL_COUNT", defaults.rival_count).clamp(1, 50),
            cache,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_or(key, default.as_secs()))
}

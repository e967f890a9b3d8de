use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Upstream data grouped by how quickly it goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    Bootstrap,
    Fixtures,
    Live,
    Standings,
    Picks,
    History,
}

impl CacheCategory {
    pub const ALL: [CacheCategory; 6] = [
        CacheCategory::Bootstrap,
        CacheCategory::Fixtures,
        CacheCategory::Live,
        CacheCategory::Standings,
        CacheCategory::Picks,
        CacheCategory::History,
    ];
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl_by_category: HashMap<CacheCategory, Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let ttl_by_category = HashMap::from([
            (CacheCategory::Bootstrap, Duration::from_secs(3600)),
            (CacheCategory::Fixtures, Duration::from_secs(1800)),
            (CacheCategory::Live, Duration::from_secs(60)),
            (CacheCategory::Standings, Duration::from_secs(300)),
            (CacheCategory::Picks, Duration::from_secs(300)),
            (CacheCategory::History, Duration::from_secs(300)),
        ]);
        Self {
            max_entries: 500,
            ttl_by_category,
        }
    }
}

impl CacheConfig {
    /// Categories without a configured TTL are never served from cache.
    pub fn ttl(&self, category: CacheCategory) -> Duration {
        self.ttl_by_category
            .get(&category)
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    category: CacheCategory,
    stored_at: Instant,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    tick: u64,
}

/// In-memory response cache keyed by request path, with a TTL per
/// `CacheCategory` and least-recently-used eviction past `max_entries`.
#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.tick += 1;
        let tick = state.tick;

        let expired = {
            let entry = state.entries.get(key)?;
            entry.stored_at.elapsed() >= self.config.ttl(entry.category)
        };
        if expired {
            state.entries.remove(key);
            return None;
        }
        let entry = state.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(entry.body.clone())
    }

    pub fn insert(&self, key: &str, category: CacheCategory, body: String) {
        if self.config.max_entries == 0 || self.config.ttl(category).is_zero() {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.tick += 1;
        let tick = state.tick;
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                body,
                category,
                stored_at: Instant::now(),
                last_used: tick,
            },
        );

        while state.entries.len() > self.config.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    state.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn get_or_fetch<E>(
        &self,
        key: &str,
        category: CacheCategory,
        fetch: impl FnOnce() -> Result<String, E>,
    ) -> Result<String, E> {
        if let Some(body) = self.get(key) {
            return Ok(body);
        }
        let body = fetch()?;
        self.insert(key, category, body.clone());
        Ok(body)
    }

    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| entry.stored_at.elapsed() < self.config.ttl(entry.category));
        before - state.entries.len()
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

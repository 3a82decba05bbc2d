// Shared TTL cache used for raw provider payloads and assembled search responses

use std::{
    collections::{BTreeMap, HashSet},
    time::{Duration, Instant},
};

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use thiserror::Error;

/// Five minutes, for both the provider payload and the query response namespaces.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Longer TTLs are clamped; entries this old are as good as permanent.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache capacity of {max_size_mb}MB exceeded while storing {key}")]
    CapacityExceeded { key: String, max_size_mb: usize },

    #[error("ttl {ttl:?} for {key} cannot be represented")]
    TtlOutOfRange { key: String, ttl: Duration },

    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size_bytes: usize,
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub rejected_count: usize,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_size_mb: usize,
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_mb: 100,
            default_ttl: DEFAULT_TTL,
        }
    }
}

/// Key/value store with per-entry TTL. Callers only issue independent `get`/`set`
/// calls and treat every error as a miss or a skipped write.
pub trait Cache: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;
}

pub fn calculate_item_size(key: &str, data: &[u8]) -> usize {
    key.len() + data.len() + std::mem::size_of::<Instant>()
}

struct CacheEntry {
    value: Bytes,
    expires_at: Instant,
}

/// In-process cache: a sharded map of entries plus an expiry index swept on reads.
pub struct TtlCache {
    store: DashMap<String, CacheEntry>,
    config: CacheConfig,
    stats: RwLock<CacheStats>,
    expiry_index: RwLock<BTreeMap<Instant, HashSet<String>>>,
}

impl TtlCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: DashMap::new(),
            config,
            stats: RwLock::new(CacheStats::default()),
            expiry_index: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    fn max_size_bytes(&self) -> usize {
        self.config.max_size_mb * 1024 * 1024
    }

    // Store mutations and their accounting happen together under the stats lock.
    // Lock order is always stats, then map shard.
    fn remove_entry(&self, key: &str, should_remove: impl FnOnce(&CacheEntry) -> bool) -> bool {
        let mut stats = self.stats.write();
        match self.store.remove_if(key, |_, entry| should_remove(entry)) {
            Some((k, entry)) => {
                stats.items_count = stats.items_count.saturating_sub(1);
                stats.size_bytes = stats
                    .size_bytes
                    .saturating_sub(calculate_item_size(&k, &entry.value));
                true
            }
            None => false,
        }
    }

    fn unindex(&self, key: &str, expires_at: Instant) {
        let mut index = self.expiry_index.write();
        if let Some(keys) = index.get_mut(&expires_at) {
            keys.remove(key);
            if keys.is_empty() {
                index.remove(&expires_at);
            }
        }
    }

    fn cleanup_expired(&self) {
        let now = Instant::now();
        loop {
            let due = {
                let mut index = self.expiry_index.write();
                match index.first_key_value() {
                    Some((expires_at, _)) if *expires_at <= now => index.pop_first(),
                    _ => None,
                }
            };

            let Some((expires_at, keys)) = due else {
                break;
            };

            for key in keys {
                // An entry rewritten since it was indexed carries a later expiry.
                if self.remove_entry(&key, |entry| entry.expires_at == expires_at) {
                    self.stats.write().expired_count += 1;
                }
            }
        }
    }

    /// Drops every entry whose key starts with `prefix`, returning how many were removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let keys: Vec<(String, Instant)> = self
            .store
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.expires_at))
            .collect();

        let mut removed = 0;
        for (key, expires_at) in keys {
            if self.remove_entry(&key, |_| true) {
                self.unindex(&key, expires_at);
                removed += 1;
            }
        }
        removed
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl Cache for TtlCache {
    fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.cleanup_expired();

        let hit = self
            .store
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone());

        let mut stats = self.stats.write();
        if hit.is_some() {
            stats.hit_count += 1;
        } else {
            stats.miss_count += 1;
        }

        Ok(hit)
    }

    fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl.min(MAX_TTL))
            .ok_or_else(|| CacheError::TtlOutOfRange {
                key: key.to_string(),
                ttl,
            })?;
        let item_size = calculate_item_size(key, &value);

        let previous = {
            let mut stats = self.stats.write();
            let replaced_size = self
                .store
                .get(key)
                .map_or(0, |entry| calculate_item_size(key, &entry.value));

            let projected = stats.size_bytes.saturating_sub(replaced_size) + item_size;
            if projected > self.max_size_bytes() {
                stats.rejected_count += 1;
                return Err(CacheError::CapacityExceeded {
                    key: key.to_string(),
                    max_size_mb: self.config.max_size_mb,
                });
            }

            let previous = self
                .store
                .insert(key.to_string(), CacheEntry { value, expires_at });
            match &previous {
                Some(previous) => {
                    stats.size_bytes = stats
                        .size_bytes
                        .saturating_sub(calculate_item_size(key, &previous.value));
                }
                None => stats.items_count += 1,
            }
            stats.size_bytes += item_size;
            previous
        };

        if let Some(previous) = previous {
            self.unindex(key, previous.expires_at);
        }
        self.expiry_index
            .write()
            .entry(expires_at)
            .or_default()
            .insert(key.to_string());

        Ok(())
    }
}

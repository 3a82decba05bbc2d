// Runtime configuration for the search pipeline, read from the environment

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use tracing::warn;

use crate::cache::CacheConfig;

pub const ENV_MAX_RETRY: &str = "FLIGHT_PROVIDER_MAX_RETRY";
pub const ENV_BACKOFF_MS: &str = "FLIGHT_PROVIDER_BACKOFF_IN_MS";
pub const ENV_FIXTURES_DIR: &str = "FLIGHT_FIXTURES_DIR";
pub const ENV_CACHE_TTL_SECONDS: &str = "SEARCH_CACHE_TTL_SECONDS";
pub const ENV_CACHE_MAX_SIZE_MB: &str = "SEARCH_CACHE_MAX_SIZE_MB";
pub const ENV_SIMULATION_SEED: &str = "FLIGHT_SIMULATION_SEED";

/// Retry budget for one provider fetch. Total attempts = `max_retries + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 8,
        }
    }
}

impl RetryConfig {
    /// Wait before `attempt` (1-based retry index): `base * 2^attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub retry: RetryConfig,
    pub fixtures_dir: PathBuf,
    pub cache: CacheConfig,
    /// Fixed seed for latency/failure draws; `None` seeds from entropy.
    pub simulation_seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            fixtures_dir: PathBuf::from("fixtures"),
            cache: CacheConfig::default(),
            simulation_seed: None,
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            retry: RetryConfig {
                max_retries: env_or(ENV_MAX_RETRY, defaults.retry.max_retries),
                base_backoff_ms: env_or(ENV_BACKOFF_MS, defaults.retry.base_backoff_ms),
            },
            fixtures_dir: env::var(ENV_FIXTURES_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.fixtures_dir),
            cache: CacheConfig {
                max_size_mb: env_or(ENV_CACHE_MAX_SIZE_MB, defaults.cache.max_size_mb),
                default_ttl: Duration::from_secs(env_or(
                    ENV_CACHE_TTL_SECONDS,
                    defaults.cache.default_ttl.as_secs(),
                )),
            },
            simulation_seed: env::var(ENV_SIMULATION_SEED)
                .ok()
                .and_then(|raw| parse_or_warn(ENV_SIMULATION_SEED, &raw)),
        }
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| parse_or_warn(key, &raw))
        .unwrap_or(default)
}

fn parse_or_warn<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = raw, "ignoring unparsable configuration value");
            None
        }
    }
}

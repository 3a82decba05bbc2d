// Simulated provider transport: cache lookup, latency, flaky success, retry with backoff

use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    cache::{Cache, DEFAULT_TTL},
    config::RetryConfig,
    context::{Interrupt, SearchContext},
};

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("fixture file not defined")]
    Undefined,

    #[error("fixture {file} not found")]
    NotFound { file: String },

    #[error("failed reading fixture {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed fetching flight data from provider: {provider} after {attempts} attempts")]
    Exhausted { provider: String, attempts: u32 },

    #[error("provider {provider} interrupted: {reason}")]
    Interrupted {
        provider: String,
        reason: Interrupt,
    },

    #[error("provider {provider} payload unavailable: {source}")]
    Fixture {
        provider: String,
        #[source]
        source: FixtureError,
    },
}

/// Static description of one simulated provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub name: String,
    /// Percentage in 0..=100; anything at or above 100 never fails.
    pub success_rate: u32,
    pub response_time_ms: (u64, u64),
    pub fixture_file: String,
}

impl ProviderDescriptor {
    pub fn new(
        name: &str,
        success_rate: u32,
        response_time_ms: (u64, u64),
        fixture_file: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            success_rate,
            response_time_ms,
            fixture_file: fixture_file.to_string(),
        }
    }
}

/// Read-only source of provider payloads keyed by file name.
#[async_trait]
pub trait FixtureSource: Send + Sync + 'static {
    async fn read(&self, file: &str) -> Result<Bytes, FixtureError>;
}

pub struct DirFixtureSource {
    base: PathBuf,
}

impl DirFixtureSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

#[async_trait]
impl FixtureSource for DirFixtureSource {
    async fn read(&self, file: &str) -> Result<Bytes, FixtureError> {
        if file.is_empty() {
            return Err(FixtureError::Undefined);
        }

        match tokio::fs::read(self.base.join(file)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FixtureError::NotFound {
                file: file.to_string(),
            }),
            Err(source) => Err(FixtureError::Io {
                file: file.to_string(),
                source,
            }),
        }
    }
}

/// Payloads held in memory, mostly for tests and embedding.
#[derive(Default)]
pub struct StaticFixtureSource {
    files: HashMap<String, Bytes>,
}

impl StaticFixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: &str, data: impl Into<Bytes>) -> Self {
        self.files.insert(file.to_string(), data.into());
        self
    }
}

#[async_trait]
impl FixtureSource for StaticFixtureSource {
    async fn read(&self, file: &str) -> Result<Bytes, FixtureError> {
        if file.is_empty() {
            return Err(FixtureError::Undefined);
        }
        self.files
            .get(file)
            .cloned()
            .ok_or_else(|| FixtureError::NotFound {
                file: file.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    Backoff { attempt: u32 },
    Latency { attempt: u32 },
}

/// Every simulated wait goes through here so it can be observed or skipped in tests.
#[async_trait]
pub trait Sleeper: Send + Sync + 'static {
    async fn sleep(
        &self,
        kind: WaitKind,
        duration: Duration,
        ctx: &SearchContext,
    ) -> Result<(), Interrupt>;
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(
        &self,
        _kind: WaitKind,
        duration: Duration,
        ctx: &SearchContext,
    ) -> Result<(), Interrupt> {
        tokio::select! {
            biased;
            reason = ctx.done() => Err(reason),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationSeed {
    Entropy,
    Fixed(u64),
}

impl SimulationSeed {
    fn rng(self) -> StdRng {
        match self {
            SimulationSeed::Entropy => StdRng::from_entropy(),
            SimulationSeed::Fixed(seed) => StdRng::seed_from_u64(seed),
        }
    }
}

impl From<Option<u64>> for SimulationSeed {
    fn from(seed: Option<u64>) -> Self {
        seed.map_or(SimulationSeed::Entropy, SimulationSeed::Fixed)
    }
}

pub struct FetchSimulator {
    cache: Arc<dyn Cache>,
    fixtures: Arc<dyn FixtureSource>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryConfig,
    cache_ttl: Duration,
    seed: SimulationSeed,
}

impl FetchSimulator {
    pub fn new(cache: Arc<dyn Cache>, fixtures: Arc<dyn FixtureSource>) -> Self {
        Self {
            cache,
            fixtures,
            sleeper: Arc::new(TokioSleeper),
            retry: RetryConfig::default(),
            cache_ttl: DEFAULT_TTL,
            seed: SimulationSeed::Entropy,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_seed(mut self, seed: SimulationSeed) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the provider's raw payload, from cache when present, otherwise after
    /// a simulated round trip that may fail and be retried with exponential backoff.
    pub async fn fetch(
        &self,
        provider: &ProviderDescriptor,
        ctx: &SearchContext,
    ) -> Result<Bytes, FetchError> {
        match self.cache.get(&provider.name) {
            Ok(Some(payload)) => {
                debug!(provider = %provider.name, "provider payload served from cache");
                return Ok(payload);
            }
            Ok(None) => {}
            Err(e) => warn!(provider = %provider.name, error = %e, "cache read failed"),
        }

        let mut rng = self.seed.rng();
        let interrupted = |reason: Interrupt| FetchError::Interrupted {
            provider: provider.name.clone(),
            reason,
        };

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let backoff = self.retry.backoff_for(attempt);
                debug!(provider = %provider.name, attempt, ?backoff, "backing off before retry");
                self.sleeper
                    .sleep(WaitKind::Backoff { attempt }, backoff, ctx)
                    .await
                    .map_err(interrupted)?;
            }

            let latency = simulated_latency(provider.response_time_ms, &mut rng);
            self.sleeper
                .sleep(WaitKind::Latency { attempt }, latency, ctx)
                .await
                .map_err(interrupted)?;

            if fetch_succeeded(provider.success_rate, &mut rng) {
                return self.read_fixture(provider).await;
            }

            debug!(provider = %provider.name, attempt, "simulated provider failure");
        }

        Err(FetchError::Exhausted {
            provider: provider.name.clone(),
            attempts: self.retry.max_retries + 1,
        })
    }

    async fn read_fixture(&self, provider: &ProviderDescriptor) -> Result<Bytes, FetchError> {
        let payload = self
            .fixtures
            .read(&provider.fixture_file)
            .await
            .map_err(|source| FetchError::Fixture {
                provider: provider.name.clone(),
                source,
            })?;

        if let Err(e) = self
            .cache
            .set(&provider.name, payload.clone(), self.cache_ttl)
        {
            warn!(provider = %provider.name, error = %e, "skipping provider payload cache write");
        }

        Ok(payload)
    }
}

pub fn fetch_succeeded(success_rate: u32, rng: &mut impl Rng) -> bool {
    if success_rate >= 100 {
        return true;
    }
    rng.gen_range(0..100) < success_rate
}

pub fn simulated_latency((min_ms, max_ms): (u64, u64), rng: &mut impl Rng) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rng.gen_range(min_ms..=max_ms))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use parking_lot::Mutex;

    /// Records every requested wait and returns immediately.
    #[derive(Default)]
    pub struct RecordingSleeper {
        waits: Mutex<Vec<(WaitKind, Duration)>>,
    }

    impl RecordingSleeper {
        pub fn waits(&self) -> Vec<(WaitKind, Duration)> {
            self.waits.lock().clone()
        }

        pub fn backoffs(&self) -> Vec<(u32, Duration)> {
            self.waits()
                .into_iter()
                .filter_map(|(kind, d)| match kind {
                    WaitKind::Backoff { attempt } => Some((attempt, d)),
                    WaitKind::Latency { .. } => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(
            &self,
            kind: WaitKind,
            duration: Duration,
            ctx: &SearchContext,
        ) -> Result<(), Interrupt> {
            self.waits.lock().push((kind, duration));
            match ctx.interrupted() {
                Some(reason) => Err(reason),
                None => Ok(()),
            }
        }
    }
}

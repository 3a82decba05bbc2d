// Aggregation orchestrator: cache-aside around a concurrent fan-out to every provider

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use futures::future::join_all;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    cache::{Cache, DEFAULT_TTL},
    config::SearchConfig,
    context::SearchContext,
    fetch_simulator::{DirFixtureSource, FetchSimulator},
    filter::apply_filters,
    models::{Flight, Metadata, SearchRequest, SearchResponse, ValidationError},
    providers::{default_providers, FlightProvider, ProviderError},
    sorter::sort_flights,
};

const QUERY_KEY_PREFIX: &str = "Q:";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// `Q:` followed by the hex SHA-256 of the request's JSON form. Callers pass a
/// normalized request so equivalent queries share a key.
pub fn cache_key(request: &SearchRequest) -> String {
    let encoded = serde_json::to_vec(request).unwrap_or_default();
    let digest = Sha256::digest(&encoded);
    format!("{QUERY_KEY_PREFIX}{}", hex::encode(digest))
}

pub struct FlightSearchService {
    providers: Vec<Arc<dyn FlightProvider>>,
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
}

impl FlightSearchService {
    pub fn new(providers: Vec<Arc<dyn FlightProvider>>, cache: Arc<dyn Cache>) -> Self {
        Self {
            providers,
            cache,
            cache_ttl: DEFAULT_TTL,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Wires the four default providers over fixtures from `config.fixtures_dir`.
    pub fn from_config(config: &SearchConfig, cache: Arc<dyn Cache>) -> Self {
        let simulator = FetchSimulator::new(
            cache.clone(),
            Arc::new(DirFixtureSource::new(config.fixtures_dir.clone())),
        )
        .with_retry(config.retry)
        .with_cache_ttl(config.cache.default_ttl)
        .with_seed(config.simulation_seed.into());

        Self::new(default_providers(Arc::new(simulator)), cache)
            .with_cache_ttl(config.cache.default_ttl)
    }

    pub fn providers(&self) -> &[Arc<dyn FlightProvider>] {
        &self.providers
    }

    /// Runs one search. Only an invalid request is an error; provider failures are
    /// counted in the metadata.
    pub async fn search(
        &self,
        request: SearchRequest,
        ctx: &SearchContext,
    ) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();
        let request = request.normalize()?;
        let key = cache_key(&request);

        if let Some(mut cached) = self.cached_response(&key) {
            cached.metadata.cache_hit = true;
            info!(
                key = %key,
                results = cached.metadata.total_results,
                "search served from cache"
            );
            return Ok(cached);
        }

        let (flights, failed) = self.fan_out(&request, ctx).await;

        let mut flights = apply_filters(flights, &request.filters);
        sort_flights(&mut flights, &request.sort_by, &request.sort_order);

        let queried = self.providers.len();
        let response = SearchResponse {
            metadata: Metadata {
                total_results: flights.len(),
                providers_queried: queried,
                providers_succeeded: queried - failed,
                providers_failed: failed,
                search_time_ms: started.elapsed().as_millis() as u64,
                cache_hit: false,
            },
            criteria: request,
            flights,
        };

        self.store_response(&key, &response);

        info!(
            origin = %response.criteria.origin,
            destination = %response.criteria.destination,
            results = response.metadata.total_results,
            succeeded = response.metadata.providers_succeeded,
            failed = response.metadata.providers_failed,
            elapsed_ms = response.metadata.search_time_ms,
            "search completed"
        );

        Ok(response)
    }

    /// Queries every provider concurrently and merges the successful lists in
    /// registration order. Returns the merged flights and the failure count.
    async fn fan_out(&self, request: &SearchRequest, ctx: &SearchContext) -> (Vec<Flight>, usize) {
        let query = Arc::new(request.clone());

        let tasks: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                let provider = provider.clone();
                let query = query.clone();
                let ctx = ctx.clone();
                tokio::spawn(async move { provider.fetch(&query, &ctx).await })
            })
            .collect();

        let results = join_all(tasks).await;

        let mut flights = Vec::new();
        let mut failed = 0;
        for (provider, joined) in self.providers.iter().zip(results) {
            let name = &provider.descriptor().name;
            let outcome = joined.unwrap_or_else(|e| {
                Err(ProviderError::TaskAborted {
                    provider: name.clone(),
                    reason: e.to_string(),
                })
            });

            match outcome {
                Ok(found) => {
                    debug!(provider = %name, count = found.len(), "provider returned flights");
                    flights.extend(found);
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "provider failed");
                    failed += 1;
                }
            }
        }

        (flights, failed)
    }

    fn cached_response(&self, key: &str) -> Option<SearchResponse> {
        let payload = match self.cache.get(key) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "search cache read failed");
                return None;
            }
        };

        match serde_json::from_slice(&payload) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable cached search");
                None
            }
        }
    }

    fn store_response(&self, key: &str, response: &SearchResponse) {
        let encoded = match serde_json::to_vec(response) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key, error = %e, "failed encoding search response for cache");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, Bytes::from(encoded), self.cache_ttl) {
            warn!(key, error = %e, "skipping search cache write");
        }
    }
}

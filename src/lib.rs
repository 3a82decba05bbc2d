// Main library file for the flight search aggregator

// Pipeline stages, bottom-up
pub mod cache;
pub mod config;
pub mod context;
pub mod fetch_simulator;
pub mod filter;
pub mod models;
pub mod providers;
pub mod scoring;
pub mod search_service;
pub mod sorter;

// Re-export key types for convenience
pub use cache::{Cache, CacheConfig, CacheError, CacheStats, TtlCache};
pub use config::{RetryConfig, SearchConfig};
pub use context::{CancelHandle, Interrupt, SearchContext};
pub use fetch_simulator::{DirFixtureSource, FetchError, FetchSimulator, ProviderDescriptor};
pub use models::{Filters, Flight, Metadata, SearchRequest, SearchResponse, ValidationError};
pub use providers::{FlightProvider, ProviderError};
pub use search_service::{cache_key, FlightSearchService, SearchError};

use std::{io::Read, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use flight_search_aggregator::{
    FlightSearchService, SearchConfig, SearchContext, SearchRequest, TtlCache,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Searches every simulated provider for flights matching a JSON query.
#[derive(Parser, Debug)]
#[clap(name = "flight-search")]
struct Args {
    /// Query file; reads stdin when omitted or `-`
    query: Option<PathBuf>,

    /// Per-search deadline in milliseconds
    #[clap(long)]
    timeout_ms: Option<u64>,

    /// Issue the same query this many times; later runs hit the result cache
    #[clap(long, default_value_t = 1)]
    repeat: u32,

    /// Directory holding provider fixtures (overrides FLIGHT_FIXTURES_DIR)
    #[clap(long)]
    fixtures: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Error: {e:?}");
        std::process::exit(1);
    }
}

fn read_query(path: Option<&PathBuf>) -> Result<SearchRequest> {
    let raw = match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("reading query from {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading query from stdin")?;
            buf
        }
    };

    serde_json::from_str(&raw).context("query is not a valid search request")
}

async fn run(args: Args) -> Result<()> {
    let mut config = SearchConfig::from_env();
    if let Some(dir) = args.fixtures {
        config.fixtures_dir = dir;
    }

    let request = read_query(args.query.as_ref())?;
    // Validate before dispatching anything
    request.clone().normalize()?;

    let cache = Arc::new(TtlCache::new(config.cache.clone()));
    let service = FlightSearchService::from_config(&config, cache.clone());

    for round in 1..=args.repeat.max(1) {
        let ctx = match args.timeout_ms {
            Some(ms) => SearchContext::background().with_timeout(Duration::from_millis(ms)),
            None => SearchContext::background(),
        };

        let response = service.search(request.clone(), &ctx).await?;
        info!(
            round,
            cache_hit = response.metadata.cache_hit,
            results = response.metadata.total_results,
            "search finished"
        );
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    let stats = cache.stats();
    info!(
        items = stats.items_count,
        hits = stats.hit_count,
        misses = stats.miss_count,
        "cache statistics"
    );

    Ok(())
}

//! Crawler module for venue discovery
//!
//! This module contains the adaptive spatial search, including:
//! - Frontier bookkeeping (candidate points and points already searched)
//! - The discovery loop that widens or narrows around productive points
//! - The entry point wiring config, gateway and store together

mod discovery;
mod frontier;

pub use discovery::{
    DiscoveryReport, DiscoverySettings, IterationSummary, SpatialCrawler, Termination,
};
pub use frontier::{Frontier, SearchStep};

use crate::api::ApiClient;
use crate::config::Config;
use crate::geo::GeoPoint;
use crate::storage::{CrawlFlag, SqliteStorage, Storage};
use crate::TrawlerError;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Crawl log type for venue searches
pub const SEARCH_CRAWL_TYPE: &str = "venue-search";

/// Runs a complete venue search
///
/// This is the main entry point for discovery. It will:
/// 1. Open the database and stamp new venues with the configured region
/// 2. Build the gateway for every configured access class
/// 3. Search outward from the configured seeds
/// 4. Log START and FINISH (or INTERRUPTED) in the crawl log
///
/// # Arguments
///
/// * `config` - The trawler configuration
/// * `config_hash` - Hash of the configuration file, stored in the crawl log
/// * `cancel` - Token that stops the search between queries
pub async fn run_search(
    config: &Config,
    config_hash: &str,
    cancel: CancellationToken,
) -> Result<DiscoveryReport, TrawlerError> {
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    storage.set_region(config.search.region.clone());

    let mut client = ApiClient::from_config(config, cancel)?;
    let mut crawler = SpatialCrawler::from_config(&config.search);

    let seeds: Vec<GeoPoint> = config
        .search
        .seeds
        .iter()
        .map(|c| GeoPoint::new(c.lat, c.lng))
        .collect();

    storage.log_crawl(SEARCH_CRAWL_TYPE, CrawlFlag::Start, Some(config_hash))?;

    let report = crawler
        .discover(&mut client, &mut storage, &seeds, config.search.target_count)
        .await?;

    let flag = match report.termination {
        Termination::Cancelled => CrawlFlag::Interrupted,
        _ => CrawlFlag::Finish,
    };
    storage.log_crawl(SEARCH_CRAWL_TYPE, flag, Some(config_hash))?;

    Ok(report)
}

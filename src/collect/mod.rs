//! Collectors that enrich stored venues
//!
//! Each collector walks a set of stored records, queries the API for each one and writes
//! what it finds back to the store. A terminal error for one item is logged and the
//! item skipped; cancellation ends the pass early and is recorded as INTERRUPTED in the
//! crawl log.

mod checkins;
mod friends;
mod statistics;

pub use checkins::CheckinMonitor;
pub use friends::FriendCrawl;
pub use statistics::StatisticsSweep;

use crate::api::RemoteError;
use crate::storage::{CrawlFlag, Storage};
use crate::TrawlerError;

/// Totals of one collector pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub crawl_type: String,
    /// Items considered for querying
    pub items_seen: u64,
    /// Items whose queries succeeded
    pub items_processed: u64,
    /// Items skipped after a terminal error
    pub items_failed: u64,
    /// Rows written to the store
    pub records_added: u64,
    pub interrupted: bool,
}

impl CollectReport {
    fn new(crawl_type: impl Into<String>) -> Self {
        Self {
            crawl_type: crawl_type.into(),
            ..Self::default()
        }
    }
}

/// What to do with an item after its query returned
enum ItemOutcome<T> {
    Done(T),
    Skip,
    Stop,
}

/// Sorts a query result into proceed, skip this item, or stop the pass
///
/// Configuration faults abort the whole pass.
fn classify<T>(
    result: Result<T, RemoteError>,
    item: &str,
    report: &mut CollectReport,
) -> Result<ItemOutcome<T>, TrawlerError> {
    match result {
        Ok(value) => Ok(ItemOutcome::Done(value)),
        Err(RemoteError::Cancelled) => {
            report.interrupted = true;
            Ok(ItemOutcome::Stop)
        }
        Err(e @ (RemoteError::Unconfigured(_) | RemoteError::InvalidEndpoint(_))) => Err(e.into()),
        Err(e) => {
            report.items_failed += 1;
            tracing::warn!("{}: skipping {}: {}", report.crawl_type, item, e);
            Ok(ItemOutcome::Skip)
        }
    }
}

fn log_start<S: Storage>(
    store: &mut S,
    report: &CollectReport,
    config_hash: Option<&str>,
) -> Result<(), TrawlerError> {
    tracing::info!("{}: started", report.crawl_type);
    store.log_crawl(&report.crawl_type, CrawlFlag::Start, config_hash)?;
    Ok(())
}

fn log_finish<S: Storage>(
    store: &mut S,
    report: &CollectReport,
    config_hash: Option<&str>,
) -> Result<(), TrawlerError> {
    let flag = if report.interrupted {
        CrawlFlag::Interrupted
    } else {
        CrawlFlag::Finish
    };
    store.log_crawl(&report.crawl_type, flag, config_hash)?;
    tracing::info!(
        "{}: {} ({} seen, {} processed, {} failed, {} records added)",
        report.crawl_type,
        flag.to_db_string(),
        report.items_seen,
        report.items_processed,
        report.items_failed,
        report.records_added
    );
    Ok(())
}

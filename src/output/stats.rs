//! Statistics generation from the venue database
//!
//! This module provides functionality for extracting and displaying
//! database totals and recent crawl log entries.

use super::OutputResult;
use crate::storage::{CrawlLogEntry, Storage, StorageCounts};

/// How many crawl log entries the report shows
const RECENT_CRAWLS: usize = 10;

/// Database statistics summary
#[derive(Debug, Clone)]
pub struct DatabaseStatistics {
    /// Row counts per table
    pub counts: StorageCounts,

    /// Venues with at least one check-in or a rising check-in count
    pub active_venues: u64,

    /// Most recent crawl log entries, newest first
    pub recent_crawls: Vec<CrawlLogEntry>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> OutputResult<DatabaseStatistics> {
    let counts = storage.counts()?;

    let mut active_venues = 0;
    for venue in storage.all_venues()? {
        if storage.is_active(&venue.id)? {
            active_venues += 1;
        }
    }

    let recent_crawls = storage.recent_crawls(RECENT_CRAWLS)?;

    Ok(DatabaseStatistics {
        counts,
        active_venues,
        recent_crawls,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &DatabaseStatistics) {
    println!("=== Venue Database Statistics ===\n");

    println!("Overview:");
    println!("  Venues: {}", stats.counts.venues);
    println!("  Active venues: {}", stats.active_venues);
    println!("  Statistics snapshots: {}", stats.counts.statistics);
    println!("  Searches recorded: {}", stats.counts.searches);
    println!("  Users: {}", stats.counts.users);
    println!("  Check-ins: {}", stats.counts.checkins);
    println!("  Friendships: {}", stats.counts.friendships);
    println!();

    if stats.counts.searches > 0 {
        println!(
            "Venues per search: {:.2}",
            stats.counts.venues as f64 / stats.counts.searches as f64
        );
        println!();
    }

    if !stats.recent_crawls.is_empty() {
        println!("Recent Crawls ({}):", stats.recent_crawls.len());
        for entry in &stats.recent_crawls {
            println!(
                "  {} {:<12} {}",
                entry.logged_at,
                entry.flag.to_db_string(),
                entry.crawl_type
            );
        }
    }
}

//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::geo::GeoPoint;
use crate::storage::{
    CheckinRecord, CrawlFlag, CrawlLogEntry, StatisticRecord, StorageCounts, UserRecord,
    VenueRecord, VenueStats,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The narrow view venue discovery needs
pub trait VenueStore {
    /// Stores a venue unless one with the same id exists
    ///
    /// # Returns
    ///
    /// `true` if the venue was newly inserted
    fn upsert(&mut self, venue: &VenueRecord) -> StorageResult<bool>;

    /// Number of distinct venues stored
    fn count(&self) -> StorageResult<u64>;

    /// Notes that a nearby search at `point` returned `results` venues
    fn record_search(&mut self, point: GeoPoint, results: usize) -> StorageResult<()>;
}

/// Trait for full storage backend implementations
///
/// This trait defines all database operations needed by the collectors and reports.
pub trait Storage: VenueStore {
    // ===== Crawl Log =====

    /// Appends a START/FINISH marker for a task
    fn log_crawl(
        &mut self,
        crawl_type: &str,
        flag: CrawlFlag,
        config_hash: Option<&str>,
    ) -> StorageResult<i64>;

    /// The most recent crawl log rows, newest first
    fn recent_crawls(&self, limit: usize) -> StorageResult<Vec<CrawlLogEntry>>;

    // ===== Venues =====

    fn get_venue(&self, venue_id: &str) -> StorageResult<Option<VenueRecord>>;

    fn all_venues(&self) -> StorageResult<Vec<VenueRecord>>;

    /// Venues stamped with `region` when they were discovered
    fn venues_in_region(&self, region: &str) -> StorageResult<Vec<VenueRecord>>;

    // ===== Statistics =====

    /// Appends a statistics snapshot taken now
    fn add_statistic(&mut self, venue_id: &str, stats: VenueStats) -> StorageResult<()>;

    /// Every snapshot of a venue, oldest first
    fn statistics_for(&self, venue_id: &str) -> StorageResult<Vec<StatisticRecord>>;

    // ===== Users & Check-ins =====

    /// Stores a user unless one with the same id exists
    fn upsert_user(&mut self, user: &UserRecord) -> StorageResult<bool>;

    /// Stores a check-in (and its user) unless one with the same id exists
    fn add_checkin(&mut self, checkin: &CheckinRecord) -> StorageResult<bool>;

    fn count_checkins_for_venue(&self, venue_id: &str) -> StorageResult<u64>;

    /// Users with at least one stored check-in
    fn users_with_checkins(&self) -> StorageResult<Vec<UserRecord>>;

    /// Whether a venue shows check-in activity
    ///
    /// A venue is active when a check-in has been seen there, or when its check-in
    /// total grew between any two statistics snapshots.
    fn is_active(&self, venue_id: &str) -> StorageResult<bool> {
        if self.count_checkins_for_venue(venue_id)? > 0 {
            return Ok(true);
        }
        let stats = self.statistics_for(venue_id)?;
        Ok(stats.windows(2).any(|w| w[1].checkins > w[0].checkins))
    }

    // ===== Friendships =====

    /// The highest friendship crawl id so far
    fn max_friendship_crawl_id(&self) -> StorageResult<Option<i64>>;

    /// Records `user_a -> user_b` once per crawl
    fn add_friendship(&mut self, user_a: &str, user_b: &str, crawl_id: i64)
        -> StorageResult<bool>;

    // ===== Statistics =====

    fn counts(&self) -> StorageResult<StorageCounts>;
}

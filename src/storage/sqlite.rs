//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::geo::GeoPoint;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageResult, VenueStore};
use crate::storage::{
    CategoryRef, CheckinRecord, CrawlFlag, CrawlLogEntry, StatisticRecord, StorageCounts,
    UserRecord, VenueRecord, VenueStats,
};
use crate::TrawlerError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const VENUE_COLUMNS: &str =
    "foursq_id, name, latitude, longitude, verified, category_id, category_name, raw_json";

const USER_COLUMNS: &str = "foursq_id, first_name, last_name, gender, home_city";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    region: Option<String>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(TrawlerError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, TrawlerError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn, region: None })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, TrawlerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn, region: None })
    }

    /// Stamps venues inserted from now on with `region`
    pub fn set_region(&mut self, region: Option<String>) {
        self.region = region;
    }

    fn query_venues(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Vec<VenueRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, read_venue_row)?;

        let mut venues = Vec::new();
        for row in rows {
            let (mut venue, raw_json) = row?;
            venue.raw = serde_json::from_str(&raw_json)?;
            venues.push(venue);
        }
        Ok(venues)
    }

    fn count_table(&self, table: &str) -> StorageResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn read_venue_row(row: &Row<'_>) -> rusqlite::Result<(VenueRecord, String)> {
    let latitude: Option<f64> = row.get(2)?;
    let longitude: Option<f64> = row.get(3)?;
    let category_id: Option<String> = row.get(5)?;
    let category_name: Option<String> = row.get(6)?;

    let venue = VenueRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        location: latitude.zip(longitude).map(|(lat, lng)| GeoPoint::new(lat, lng)),
        verified: row.get(4)?,
        category: category_id
            .zip(category_name)
            .map(|(id, name)| CategoryRef { id, name }),
        stats: None,
        raw: serde_json::Value::Null,
    };
    Ok((venue, row.get(7)?))
}

fn read_user_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        gender: row.get(3)?,
        home_city: row.get(4)?,
    })
}

impl VenueStore for SqliteStorage {
    fn upsert(&mut self, venue: &VenueRecord) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO venues
             (foursq_id, name, latitude, longitude, verified, category_id, category_name,
              region, raw_json, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                venue.id,
                venue.name,
                venue.location.map(|p| p.lat()),
                venue.location.map(|p| p.lng()),
                venue.verified,
                venue.category.as_ref().map(|c| c.id.as_str()),
                venue.category.as_ref().map(|c| c.name.as_str()),
                self.region,
                venue.raw.to_string(),
                now,
            ],
        )? == 1;

        // first sighting carries the initial statistics snapshot
        if inserted {
            if let Some(stats) = venue.stats {
                tx.execute(
                    "INSERT INTO statistics (venue_id, recorded_at, checkins, users)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![venue.id, now, stats.checkins, stats.users],
                )?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn count(&self) -> StorageResult<u64> {
        self.count_table("venues")
    }

    fn record_search(&mut self, point: GeoPoint, results: usize) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO searches (latitude, longitude, results, searched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![point.lat(), point.lng(), results as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl Storage for SqliteStorage {
    // ===== Crawl Log =====

    fn log_crawl(
        &mut self,
        crawl_type: &str,
        flag: CrawlFlag,
        config_hash: Option<&str>,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO crawl_log (crawl_type, flag, logged_at, config_hash)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                crawl_type,
                flag.to_db_string(),
                Utc::now().to_rfc3339(),
                config_hash
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn recent_crawls(&self, limit: usize) -> StorageResult<Vec<CrawlLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, crawl_type, flag, logged_at, config_hash
             FROM crawl_log ORDER BY id DESC LIMIT ?1",
        )?;

        let entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(CrawlLogEntry {
                    id: row.get(0)?,
                    crawl_type: row.get(1)?,
                    flag: CrawlFlag::from_db_string(&row.get::<_, String>(2)?)
                        .unwrap_or(CrawlFlag::Interrupted),
                    logged_at: row.get(3)?,
                    config_hash: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    // ===== Venues =====

    fn get_venue(&self, venue_id: &str) -> StorageResult<Option<VenueRecord>> {
        let sql = format!("SELECT {} FROM venues WHERE foursq_id = ?1", VENUE_COLUMNS);
        Ok(self.query_venues(&sql, &[&venue_id])?.into_iter().next())
    }

    fn all_venues(&self) -> StorageResult<Vec<VenueRecord>> {
        let sql = format!("SELECT {} FROM venues ORDER BY id", VENUE_COLUMNS);
        self.query_venues(&sql, &[])
    }

    fn venues_in_region(&self, region: &str) -> StorageResult<Vec<VenueRecord>> {
        let sql = format!(
            "SELECT {} FROM venues WHERE region = ?1 ORDER BY id",
            VENUE_COLUMNS
        );
        self.query_venues(&sql, &[&region])
    }

    // ===== Statistics =====

    fn add_statistic(&mut self, venue_id: &str, stats: VenueStats) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO statistics (venue_id, recorded_at, checkins, users)
             VALUES (?1, ?2, ?3, ?4)",
            params![venue_id, Utc::now().to_rfc3339(), stats.checkins, stats.users],
        )?;
        tracing::debug!(
            "Statistics added for {}: {} checkins, {} users",
            venue_id,
            stats.checkins,
            stats.users
        );
        Ok(())
    }

    fn statistics_for(&self, venue_id: &str) -> StorageResult<Vec<StatisticRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT venue_id, recorded_at, checkins, users
             FROM statistics WHERE venue_id = ?1 ORDER BY id",
        )?;

        let stats = stmt
            .query_map(params![venue_id], |row| {
                Ok(StatisticRecord {
                    venue_id: row.get(0)?,
                    recorded_at: row.get(1)?,
                    checkins: row.get(2)?,
                    users: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stats)
    }

    // ===== Users & Check-ins =====

    fn upsert_user(&mut self, user: &UserRecord) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO users
             (foursq_id, first_name, last_name, gender, home_city, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.first_name,
                user.last_name,
                user.gender,
                user.home_city,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(inserted == 1)
    }

    fn add_checkin(&mut self, checkin: &CheckinRecord) -> StorageResult<bool> {
        self.upsert_user(&checkin.user)?;

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO checkins
             (foursq_id, user_id, venue_id, created_at, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                checkin.id,
                checkin.user.id,
                checkin.venue_id,
                checkin.created_at,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(inserted == 1)
    }

    fn count_checkins_for_venue(&self, venue_id: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM checkins WHERE venue_id = ?1",
            params![venue_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn users_with_checkins(&self) -> StorageResult<Vec<UserRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM users
             WHERE EXISTS (SELECT 1 FROM checkins WHERE checkins.user_id = users.foursq_id)
             ORDER BY id",
            USER_COLUMNS
        ))?;

        let users = stmt
            .query_map([], read_user_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    // ===== Friendships =====

    fn max_friendship_crawl_id(&self) -> StorageResult<Option<i64>> {
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(crawl_id) FROM friendships", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .optional()?
            .flatten();
        Ok(max)
    }

    fn add_friendship(
        &mut self,
        user_a: &str,
        user_b: &str,
        crawl_id: i64,
    ) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO friendships (user_a, user_b, crawled_at, crawl_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_a, user_b, Utc::now().to_rfc3339(), crawl_id],
        )?;
        Ok(inserted == 1)
    }

    // ===== Statistics =====

    fn counts(&self) -> StorageResult<StorageCounts> {
        Ok(StorageCounts {
            venues: self.count_table("venues")?,
            users: self.count_table("users")?,
            checkins: self.count_table("checkins")?,
            friendships: self.count_table("friendships")?,
            searches: self.count_table("searches")?,
            statistics: self.count_table("statistics")?,
        })
    }
}

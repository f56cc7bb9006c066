//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the trawler, including:
//! - SQLite database initialization and schema management
//! - Idempotent venue, user and check-in persistence
//! - Venue statistics snapshots and friendship edges
//! - The crawl log and the record of every nearby search

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult, VenueStore};

use crate::geo::GeoPoint;
use crate::TrawlerError;
use serde_json::Value;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(TrawlerError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, TrawlerError> {
    SqliteStorage::new(path)
}

/// Primary category of a venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
}

/// Check-in and visitor totals reported by the API at one moment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueStats {
    pub checkins: i64,
    pub users: i64,
}

impl VenueStats {
    /// Reads `{checkinsCount, usersCount}`
    pub fn from_json(stats: &Value) -> Option<Self> {
        Some(Self {
            checkins: stats.get("checkinsCount")?.as_i64()?,
            users: stats.get("usersCount")?.as_i64()?,
        })
    }
}

/// A venue as returned by a search or details query
#[derive(Debug, Clone, PartialEq)]
pub struct VenueRecord {
    /// Remote identifier; the only field discovery relies on
    pub id: String,
    pub name: String,
    pub location: Option<GeoPoint>,
    pub verified: bool,
    pub category: Option<CategoryRef>,
    pub stats: Option<VenueStats>,
    /// The venue object exactly as received
    pub raw: Value,
}

impl VenueRecord {
    pub fn from_json(venue: &Value) -> StorageResult<Self> {
        let id = venue
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StorageError::InvalidRecord("venue without id".to_string()))?;

        let location = venue.get("location").and_then(|loc| {
            let lat = loc.get("lat")?.as_f64()?;
            let lng = loc.get("lng")?.as_f64()?;
            Some(GeoPoint::new(lat, lng))
        });

        let category = venue
            .get("categories")
            .and_then(Value::as_array)
            .and_then(|categories| {
                categories
                    .iter()
                    .find(|c| c.get("primary").and_then(Value::as_bool) == Some(true))
            })
            .and_then(|c| {
                Some(CategoryRef {
                    id: c.get("id")?.as_str()?.to_string(),
                    name: c.get("name")?.as_str()?.to_string(),
                })
            });

        Ok(Self {
            id: id.to_string(),
            name: str_field(venue, "name").unwrap_or_default(),
            location,
            verified: venue
                .get("verified")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            category,
            stats: venue.get("stats").and_then(VenueStats::from_json),
            raw: venue.clone(),
        })
    }
}

/// A user profile as returned in check-ins and friend lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub home_city: Option<String>,
}

impl UserRecord {
    pub fn from_json(user: &Value) -> StorageResult<Self> {
        let id = str_field(user, "id")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StorageError::InvalidRecord("user without id".to_string()))?;

        Ok(Self {
            id,
            first_name: str_field(user, "firstName").unwrap_or_default(),
            last_name: str_field(user, "lastName"),
            gender: str_field(user, "gender"),
            home_city: str_field(user, "homeCity"),
        })
    }
}

/// A check-in seen at a venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinRecord {
    pub id: String,
    pub venue_id: String,
    pub user: UserRecord,
    /// Seconds since the epoch, as reported by the API
    pub created_at: Option<i64>,
}

impl CheckinRecord {
    pub fn from_json(checkin: &Value, venue_id: &str) -> StorageResult<Self> {
        let id = str_field(checkin, "id")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StorageError::InvalidRecord("check-in without id".to_string()))?;
        let user = checkin
            .get("user")
            .ok_or_else(|| StorageError::InvalidRecord(format!("check-in {} without user", id)))
            .and_then(UserRecord::from_json)?;

        Ok(Self {
            id,
            venue_id: venue_id.to_string(),
            user,
            created_at: checkin.get("createdAt").and_then(Value::as_i64),
        })
    }
}

/// One statistics snapshot of a venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticRecord {
    pub venue_id: String,
    pub recorded_at: String,
    pub checkins: i64,
    pub users: i64,
}

/// Marker written to the crawl log at the edges of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlFlag {
    Start,
    Finish,
    Interrupted,
}

impl CrawlFlag {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Finish => "FINISH",
            Self::Interrupted => "INTERRUPTED",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "START" => Some(Self::Start),
            "FINISH" => Some(Self::Finish),
            "INTERRUPTED" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

/// Represents a crawl log row
#[derive(Debug, Clone)]
pub struct CrawlLogEntry {
    pub id: i64,
    pub crawl_type: String,
    pub flag: CrawlFlag,
    pub logged_at: String,
    pub config_hash: Option<String>,
}

/// Row counts of every table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageCounts {
    pub venues: u64,
    pub users: u64,
    pub checkins: u64,
    pub friendships: u64,
    pub searches: u64,
    pub statistics: u64,
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the trawler database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Every venue ever returned by a search
CREATE TABLE IF NOT EXISTS venues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    foursq_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    latitude REAL,
    longitude REAL,
    verified INTEGER NOT NULL DEFAULT 0,
    category_id TEXT,
    category_name TEXT,
    region TEXT,
    raw_json TEXT NOT NULL,
    discovered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_venues_region ON venues(region);

-- Check-in and visitor totals over time
CREATE TABLE IF NOT EXISTS statistics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    venue_id TEXT NOT NULL REFERENCES venues(foursq_id),
    recorded_at TEXT NOT NULL,
    checkins INTEGER NOT NULL,
    users INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_statistics_venue ON statistics(venue_id);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    foursq_id TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT,
    gender TEXT,
    home_city TEXT,
    added_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS checkins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    foursq_id TEXT NOT NULL UNIQUE,
    user_id TEXT NOT NULL REFERENCES users(foursq_id),
    venue_id TEXT NOT NULL,
    created_at INTEGER,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_checkins_venue ON checkins(venue_id);
CREATE INDEX IF NOT EXISTS idx_checkins_user ON checkins(user_id);

-- One row per direction per friendship crawl
CREATE TABLE IF NOT EXISTS friendships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_a TEXT NOT NULL,
    user_b TEXT NOT NULL,
    crawled_at TEXT NOT NULL,
    crawl_id INTEGER NOT NULL,
    UNIQUE(user_a, user_b, crawl_id)
);

-- Every nearby search issued by venue discovery
CREATE TABLE IF NOT EXISTS searches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    results INTEGER NOT NULL,
    searched_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS crawl_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crawl_type TEXT NOT NULL,
    flag TEXT NOT NULL,
    logged_at TEXT NOT NULL,
    config_hash TEXT
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

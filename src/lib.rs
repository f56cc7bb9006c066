//! Venue-Trawler: a quota-aware venue discovery crawler
//!
//! This crate collects venue, check-in and friendship data from a Foursquare-style
//! location API. All remote traffic goes through a paced, credential-rotating gateway,
//! and venues are discovered by an adaptive frontier crawl over nearby searches.

pub mod api;
pub mod collect;
pub mod config;
pub mod crawler;
pub mod geo;
pub mod output;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

/// Main error type for Venue-Trawler operations
#[derive(Debug, Error)]
pub enum TrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Remote API error: {0}")]
    Remote(#[from] api::RemoteError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Venue-Trawler operations
pub type Result<T> = std::result::Result<T, TrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use api::{AccessClass, ApiClient, Gateway, HttpGateway, RemoteError, RetryPolicy};
pub use config::Config;
pub use crawler::{DiscoveryReport, SpatialCrawler};
pub use geo::{Delta, GeoPoint};
pub use storage::{SqliteStorage, Storage, VenueRecord, VenueStore};

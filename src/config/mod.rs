//! Configuration module for Venue-Trawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use venue_trawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawler.toml")).unwrap();
//! println!("Searching until {} venues are known", config.search.target_count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, AuthenticatedConfig, ClientCredentialConfig, Config, CoordinateConfig,
    MonitorConfig, OutputConfig, RetryConfig, SearchConfig, UserlessConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

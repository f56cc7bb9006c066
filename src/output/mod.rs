//! Output module for exports and reports
//!
//! This module handles:
//! - Exporting stored venues as KML placemarks
//! - Summarising database contents and the crawl log

mod kml;
pub mod stats;

pub use kml::{export_kml, format_kml, xml_escape};
pub use stats::{load_statistics, print_statistics, DatabaseStatistics};

use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

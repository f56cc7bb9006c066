use crate::geo::GeoPoint;
use crate::storage::traits::{StorageResult, VenueStore};
use crate::storage::VenueRecord;
use std::collections::HashMap;

/// Venue store kept entirely in memory
///
/// Holds only what discovery needs; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    venues: HashMap<String, VenueRecord>,
    searches: Vec<(GeoPoint, usize)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, venue_id: &str) -> bool {
        self.venues.contains_key(venue_id)
    }

    pub fn venues(&self) -> impl Iterator<Item = &VenueRecord> {
        self.venues.values()
    }

    /// Every search recorded so far, in order
    pub fn searches(&self) -> &[(GeoPoint, usize)] {
        &self.searches
    }
}

impl VenueStore for MemoryStore {
    fn upsert(&mut self, venue: &VenueRecord) -> StorageResult<bool> {
        if self.venues.contains_key(&venue.id) {
            return Ok(false);
        }
        self.venues.insert(venue.id.clone(), venue.clone());
        Ok(true)
    }

    fn count(&self) -> StorageResult<u64> {
        Ok(self.venues.len() as u64)
    }

    fn record_search(&mut self, point: GeoPoint, results: usize) -> StorageResult<()> {
        self.searches.push((point, results));
        Ok(())
    }
}

//! Adaptive spatial venue discovery
//!
//! # Algorithm
//!
//! 1. Seed the frontier with the start points at the initial offset
//! 2. Pick a frontier point P at random
//! 3. Search P and its 8 compass neighbours at P's offset, skipping points already queried
//! 4. If the store did not grow, drop P and add its unqueried neighbours at the initial
//!    offset; otherwise keep P and halve its offset (never below the floor)
//! 5. Repeat until the frontier is empty, the target count is reached, or the run is
//!    cancelled

use super::frontier::Frontier;
use crate::api::{AccessClass, ApiClient, Gateway, RemoteError};
use crate::config::SearchConfig;
use crate::geo::{Delta, GeoPoint};
use crate::storage::{VenueRecord, VenueStore};
use crate::TrawlerError;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Why a discovery run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    FrontierExhausted,
    TargetReached,
    Cancelled,
}

/// What happened to the picked point in one iteration
#[derive(Debug, Clone, PartialEq)]
pub struct IterationSummary {
    pub point: GeoPoint,
    /// Offset the neighbours were searched at
    pub delta: Delta,
    pub new_venues: u64,
    /// Whether the point left the frontier
    pub removed: bool,
}

/// Outcome of a discovery run
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    pub termination: Termination,
    pub iterations: Vec<IterationSummary>,
    /// Nearby searches issued, including failed ones
    pub queries: u64,
    /// Searches that ended in a terminal error and were skipped
    pub failed_queries: u64,
    pub venues_before: u64,
    pub venues_after: u64,
}

impl DiscoveryReport {
    pub fn new_venues(&self) -> u64 {
        self.venues_after.saturating_sub(self.venues_before)
    }
}

/// Tunables of a discovery run
#[derive(Debug, Clone, Copy)]
pub struct DiscoverySettings {
    pub initial_delta: Delta,
    pub min_delta: Delta,
    pub limit: u32,
    pub access: AccessClass,
}

impl DiscoverySettings {
    pub fn from_config(config: &SearchConfig) -> Self {
        let initial_delta = Delta::from_degrees(config.initial_delta);
        Self {
            initial_delta,
            min_delta: Delta::from_degrees(config.min_delta).min(initial_delta),
            limit: config.limit,
            access: config.access,
        }
    }
}

/// Drives nearby searches outward from seed points until venues stop turning up
#[derive(Debug)]
pub struct SpatialCrawler {
    settings: DiscoverySettings,
    rng: StdRng,
}

impl SpatialCrawler {
    pub fn new(settings: DiscoverySettings, rng: StdRng) -> Self {
        Self { settings, rng }
    }

    /// Builds a crawler from config; a fixed `rng-seed` makes runs repeatable
    pub fn from_config(config: &SearchConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(DiscoverySettings::from_config(config), rng)
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Runs discovery until the frontier empties, the store holds `target_count` venues,
    /// or the client's cancellation token fires
    ///
    /// Searches that fail terminally are logged, counted and treated as empty. Store
    /// failures abort the run.
    pub async fn discover<G, S>(
        &mut self,
        client: &mut ApiClient<G>,
        store: &mut S,
        seeds: &[GeoPoint],
        target_count: u64,
    ) -> Result<DiscoveryReport, TrawlerError>
    where
        G: Gateway,
        S: VenueStore,
    {
        let initial_delta = self.settings.initial_delta;
        let mut frontier = Frontier::new();
        for seed in seeds {
            frontier.push(*seed, initial_delta);
        }

        let venues_before = store.count()?;
        let mut report = DiscoveryReport {
            termination: Termination::FrontierExhausted,
            iterations: Vec::new(),
            queries: 0,
            failed_queries: 0,
            venues_before,
            venues_after: venues_before,
        };

        tracing::info!(
            "Venue search started from {} seed(s), {} venues known, target {}",
            frontier.len(),
            venues_before,
            target_count
        );

        'search: loop {
            if client.is_cancelled() {
                report.termination = Termination::Cancelled;
                break;
            }

            let count_before = store.count()?;
            if count_before >= target_count {
                report.termination = Termination::TargetReached;
                break;
            }

            let Some(index) = frontier.pick(&mut self.rng) else {
                report.termination = Termination::FrontierExhausted;
                break;
            };
            let (point, delta) = match frontier.get(index) {
                Some(step) => (step.point, step.delta),
                None => break,
            };

            tracing::info!("start point: {} (delta {:.7})", point, delta.degrees());

            for candidate in point.with_neighbours(delta) {
                if frontier.is_visited(&candidate) {
                    continue;
                }
                if client.is_cancelled() {
                    report.termination = Termination::Cancelled;
                    break 'search;
                }

                report.queries += 1;
                match client
                    .find_venues_near(self.settings.access, candidate, self.settings.limit)
                    .await
                {
                    Ok(venues) => {
                        let mut inserted = 0;
                        for venue in &venues {
                            match VenueRecord::from_json(venue) {
                                Ok(record) => {
                                    if store.upsert(&record)? {
                                        inserted += 1;
                                    }
                                }
                                Err(e) => tracing::warn!("Skipping venue near {}: {}", candidate, e),
                            }
                        }
                        store.record_search(candidate, venues.len())?;
                        tracing::debug!(
                            "{}: {} venue(s), {} new",
                            candidate,
                            venues.len(),
                            inserted
                        );
                    }
                    Err(RemoteError::Cancelled) => {
                        report.termination = Termination::Cancelled;
                        break 'search;
                    }
                    Err(e @ (RemoteError::Unconfigured(_) | RemoteError::InvalidEndpoint(_))) => {
                        return Err(e.into());
                    }
                    Err(e) => {
                        report.failed_queries += 1;
                        tracing::warn!("Search at {} failed, treating as empty: {}", candidate, e);
                    }
                }

                frontier.mark_visited(candidate);
            }

            let count_after = store.count()?;
            let new_venues = count_after.saturating_sub(count_before);

            if new_venues == 0 {
                frontier.remove(index);
                let mut added = 0;
                for neighbour in point.neighbours(initial_delta) {
                    if frontier.push(neighbour, initial_delta) {
                        added += 1;
                    }
                }
                tracing::info!(
                    "no new venues, point removed: {} ({} new start point(s))",
                    point,
                    added
                );
            } else if let Some(step) = frontier.get_mut(index) {
                step.delta = step.delta.halved(self.settings.min_delta);
                step.last_new_venues = new_venues;
                tracing::info!(
                    "{} new venue(s), keeping {} at delta {:.7}",
                    new_venues,
                    point,
                    step.delta.degrees()
                );
            }

            report.iterations.push(IterationSummary {
                point,
                delta,
                new_venues,
                removed: new_venues == 0,
            });
            tracing::debug!(
                "venues: {}, start points: {}, points searched: {}",
                count_after,
                frontier.len(),
                frontier.visited_count()
            );
        }

        report.venues_after = store.count()?;
        tracing::info!(
            "Venue search finished ({:?}): {} queries, {} failed, {} new venues",
            report.termination,
            report.queries,
            report.failed_queries,
            report.new_venues()
        );

        Ok(report)
    }
}

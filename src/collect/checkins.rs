use super::{classify, log_finish, log_start, CollectReport, ItemOutcome};
use crate::api::{ApiClient, Gateway};
use crate::config::MonitorConfig;
use crate::geo::GeoPoint;
use crate::storage::{CheckinRecord, Storage};
use crate::TrawlerError;
use serde_json::Value;

/// Polls active venues of a region for people currently checked in
#[derive(Debug, Clone)]
pub struct CheckinMonitor {
    region: String,
    centre: GeoPoint,
    radius: f64,
    require_activity: bool,
}

impl CheckinMonitor {
    pub fn new(region: impl Into<String>, centre: GeoPoint, radius: f64) -> Self {
        Self {
            region: region.into(),
            centre,
            radius,
            require_activity: true,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            require_activity: config.require_activity,
            ..Self::new(
                config.region.clone(),
                GeoPoint::new(config.centre.lat, config.centre.lng),
                config.radius,
            )
        }
    }

    pub fn with_require_activity(mut self, require_activity: bool) -> Self {
        self.require_activity = require_activity;
        self
    }

    pub fn crawl_type(&self) -> String {
        format!("monitor-checkins-{}", self.region)
    }

    fn in_area(&self, location: Option<GeoPoint>) -> bool {
        location.is_some_and(|p| p.distance_deg(&self.centre) <= self.radius)
    }

    /// One pass over the region's venues
    pub async fn run_pass<G, S>(
        &self,
        client: &mut ApiClient<G>,
        store: &mut S,
        config_hash: Option<&str>,
    ) -> Result<CollectReport, TrawlerError>
    where
        G: Gateway,
        S: Storage,
    {
        let mut report = CollectReport::new(self.crawl_type());
        log_start(store, &report, config_hash)?;

        let venues = store.venues_in_region(&self.region)?;
        tracing::info!("{} venues stored for {}", venues.len(), self.region);

        for venue in venues {
            if !self.in_area(venue.location) {
                continue;
            }
            if self.require_activity && !store.is_active(&venue.id)? {
                continue;
            }
            report.items_seen += 1;

            let details = match classify(client.venue(&venue.id).await, &venue.id, &mut report)? {
                ItemOutcome::Done(details) => details,
                ItemOutcome::Skip => continue,
                ItemOutcome::Stop => break,
            };
            report.items_processed += 1;

            let here_now = details
                .get("hereNow")
                .and_then(|h| h.get("count"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            tracing::debug!("{}: {} checked in at {}", self.region, here_now, venue.name);
            if here_now == 0 {
                continue;
            }

            let items = match classify(
                client.venue_here_now(&venue.id).await,
                &venue.id,
                &mut report,
            )? {
                ItemOutcome::Done(items) => items,
                ItemOutcome::Skip => continue,
                ItemOutcome::Stop => break,
            };

            for item in &items {
                match CheckinRecord::from_json(item, &venue.id) {
                    Ok(checkin) => {
                        if store.add_checkin(&checkin)? {
                            report.records_added += 1;
                        }
                    }
                    Err(e) => tracing::warn!("{}: bad check-in at {}: {}", self.region, venue.id, e),
                }
            }
        }

        log_finish(store, &report, config_hash)?;
        Ok(report)
    }
}

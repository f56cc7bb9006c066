use super::{classify, log_finish, log_start, CollectReport, ItemOutcome};
use crate::api::{ApiClient, Gateway};
use crate::storage::{Storage, VenueStats};
use crate::TrawlerError;

/// Appends a fresh statistics snapshot for every stored venue
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsSweep;

impl StatisticsSweep {
    pub const CRAWL_TYPE: &'static str = "check-stats";

    pub async fn run<G, S>(
        &self,
        client: &mut ApiClient<G>,
        store: &mut S,
        config_hash: Option<&str>,
    ) -> Result<CollectReport, TrawlerError>
    where
        G: Gateway,
        S: Storage,
    {
        let mut report = CollectReport::new(Self::CRAWL_TYPE);
        log_start(store, &report, config_hash)?;

        for venue in store.all_venues()? {
            report.items_seen += 1;
            tracing::debug!("retrieve details for venue: {} ({})", venue.name, venue.id);

            let details = match classify(client.venue(&venue.id).await, &venue.id, &mut report)? {
                ItemOutcome::Done(details) => details,
                ItemOutcome::Skip => continue,
                ItemOutcome::Stop => break,
            };

            match details.get("stats").and_then(VenueStats::from_json) {
                Some(stats) => {
                    store.add_statistic(&venue.id, stats)?;
                    report.items_processed += 1;
                    report.records_added += 1;
                }
                None => {
                    report.items_failed += 1;
                    tracing::warn!("{}: no stats for venue {}", Self::CRAWL_TYPE, venue.id);
                }
            }
        }

        log_finish(store, &report, config_hash)?;
        Ok(report)
    }
}

//! Per-class request pacing derived from hourly quotas

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Pacing for one access class
///
/// Calls are spaced at least `interval` apart, measured from the dispatch of the previous
/// call. This is a pacing primitive rather than a token bucket: idle time does not build up
/// credit for bursts.
#[derive(Debug, Clone)]
pub struct RateMonitor {
    interval: Duration,
    next_eligible: Option<Instant>,
}

impl RateMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_eligible: None,
        }
    }

    /// Spreads `hourly_quota` calls per credential evenly over an hour
    pub fn from_quota(hourly_quota: u32, credential_count: usize) -> Self {
        let calls_per_hour = f64::from(hourly_quota.max(1)) * credential_count.max(1) as f64;
        Self::new(Duration::from_secs_f64(3600.0 / calls_per_hour))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the next call is allowed and books the slot after it
    ///
    /// Returns the instant the caller may dispatch at. The first call never waits.
    pub async fn wait_for_slot(&mut self) -> Instant {
        if let Some(next) = self.next_eligible {
            sleep_until(next).await;
        }

        let now = Instant::now();
        self.next_eligible = Some(now + self.interval);
        now
    }
}

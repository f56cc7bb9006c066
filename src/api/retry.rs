//! Tenacious querying
//!
//! Transient failures are retried on a capped exponential ladder:
//!
//! | Failure | Action |
//! |---------|--------|
//! | Network | retry |
//! | Request with transient server status (default 500-504) | retry |
//! | RateLimited | retry, logged at warn (optionally bounded) |
//! | Request with any other status | return immediately |
//! | Decode, InvalidEndpoint, Unconfigured | return immediately |

use super::envelope::Envelope;
use super::gateway::{Gateway, RemoteError};
use super::{AccessClass, Params};
use crate::config::RetryConfig;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base: Duration,
    cap: Duration,
    transient_statuses: BTreeSet<u16>,
    max_rate_limited_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(6),
            cap: Duration::from_secs(300),
            transient_statuses: (500..=504).collect(),
            max_rate_limited_retries: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap: cap.max(base),
            ..Self::default()
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            base: Duration::from_secs_f64(config.base_backoff_secs),
            cap: Duration::from_secs_f64(config.max_backoff_secs.max(config.base_backoff_secs)),
            transient_statuses: config.transient_statuses.iter().copied().collect(),
            max_rate_limited_retries: config.max_rate_limited_retries,
        }
    }

    pub fn with_max_rate_limited_retries(mut self, bound: Option<u32>) -> Self {
        self.max_rate_limited_retries = bound;
        self
    }

    /// Whether an error is worth another attempt
    pub fn is_retryable(&self, error: &RemoteError) -> bool {
        match error {
            RemoteError::Network(_) | RemoteError::RateLimited { .. } => true,
            RemoteError::Request { status, .. } => self.transient_statuses.contains(status),
            RemoteError::Decode(_)
            | RemoteError::InvalidEndpoint(_)
            | RemoteError::Unconfigured(_)
            | RemoteError::Cancelled => false,
        }
    }

    /// The sleep that follows `current`
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.cap)
    }

    /// The infinite sequence of sleeps between consecutive attempts
    pub fn backoff_schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::successors(Some(self.base), move |d| Some(self.next_backoff(*d)))
    }

    /// Issues a call, retrying transient failures until it succeeds or fails terminally
    ///
    /// A cancelled token interrupts a backoff sleep and yields [`RemoteError::Cancelled`].
    pub async fn call_tenaciously<G: Gateway>(
        &self,
        gateway: &mut G,
        class: AccessClass,
        path: &str,
        params: &Params,
        cancel: &CancellationToken,
    ) -> Result<Envelope, RemoteError> {
        let mut backoff = self.base;
        let mut rate_limited = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(RemoteError::Cancelled);
            }

            let error = match gateway.call(class, path, params).await {
                Ok(envelope) => return Ok(envelope),
                Err(e) => e,
            };

            if !self.is_retryable(&error) {
                return Err(error);
            }

            if let RemoteError::RateLimited { .. } = error {
                rate_limited += 1;
                if self
                    .max_rate_limited_retries
                    .is_some_and(|bound| rate_limited > bound)
                {
                    tracing::warn!("{} still rate limited, giving up: {}", path, error);
                    return Err(error);
                }
                tracing::warn!(
                    "{} rate limited, sleeping for {:?}: {}",
                    path,
                    backoff,
                    error
                );
            } else {
                tracing::debug!(
                    "query error due to \"{}\", sleeping for {:?}",
                    error,
                    backoff
                );
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }

            backoff = self.next_backoff(backoff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{envelope_ok, FnGateway};
    use serde_json::json;
    use tokio::time::Instant;

    fn rate_limited() -> RemoteError {
        RemoteError::RateLimited {
            status: 403,
            detail: Some("Quota exceeded".to_string()),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let schedule: Vec<u64> = policy
            .backoff_schedule()
            .take(9)
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(schedule, vec![6, 12, 24, 48, 96, 192, 300, 300, 300]);
    }

    #[test]
    fn test_classification() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(&RemoteError::Network("reset".to_string())));
        assert!(policy.is_retryable(&rate_limited()));
        for status in 500..=504 {
            assert!(policy.is_retryable(&RemoteError::Request {
                status,
                error_type: None,
                detail: None,
            }));
        }
        for status in [400, 401, 403, 404, 505] {
            assert!(!policy.is_retryable(&RemoteError::Request {
                status,
                error_type: None,
                detail: None,
            }));
        }
        assert!(!policy.is_retryable(&RemoteError::Decode("bad".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_returns_after_one_attempt() {
        let mut gateway = FnGateway::new(|_, _, _| {
            Err(RemoteError::Request {
                status: 400,
                error_type: Some("param_error".to_string()),
                detail: None,
            })
        });
        let start = Instant::now();

        let result = RetryPolicy::default()
            .call_tenaciously(
                &mut gateway,
                AccessClass::Userless,
                "/venues/search",
                &Params::new(),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(RemoteError::Request { status: 400, .. })));
        assert_eq!(gateway.calls().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_twice_then_success() {
        let mut gateway = FnGateway::new(|n, _, _| {
            if n < 2 {
                Err(rate_limited())
            } else {
                Ok(envelope_ok(json!({"ok": true})))
            }
        });
        let start = Instant::now();

        let envelope = RetryPolicy::default()
            .call_tenaciously(
                &mut gateway,
                AccessClass::Authenticated,
                "/users/self",
                &Params::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(envelope.response["ok"], true);
        assert_eq!(gateway.calls().len(), 3);
        // two sleeps: 6s then 12s
        assert_eq!(start.elapsed(), Duration::from_secs(18));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_follow_ladder() {
        let mut gateway = FnGateway::new(|n, _, _| {
            if n < 9 {
                Err(RemoteError::Network("connection reset".to_string()))
            } else {
                Ok(envelope_ok(json!({})))
            }
        });

        RetryPolicy::default()
            .call_tenaciously(
                &mut gateway,
                AccessClass::Userless,
                "/venues/v1",
                &Params::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let gaps: Vec<u64> = gateway
            .calls()
            .windows(2)
            .map(|w| (w[1].at - w[0].at).as_secs())
            .collect();
        assert_eq!(gaps, vec![6, 12, 24, 48, 96, 192, 300, 300, 300]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_bound() {
        let mut gateway = FnGateway::new(|_, _, _| Err(rate_limited()));

        let result = RetryPolicy::default()
            .with_max_rate_limited_retries(Some(2))
            .call_tenaciously(
                &mut gateway,
                AccessClass::Userless,
                "/venues/search",
                &Params::new(),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(RemoteError::RateLimited { .. })));
        assert_eq!(gateway.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let mut gateway = FnGateway::new(move |n, _, _| {
            if n == 1 {
                trigger.cancel();
            }
            Err(RemoteError::Request {
                status: 503,
                error_type: None,
                detail: None,
            })
        });

        let result = RetryPolicy::default()
            .call_tenaciously(
                &mut gateway,
                AccessClass::Userless,
                "/venues/search",
                &Params::new(),
                &cancel,
            )
            .await;

        assert!(matches!(result, Err(RemoteError::Cancelled)));
        assert_eq!(gateway.calls().len(), 2);
    }
}

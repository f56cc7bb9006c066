//! The single point through which all remote queries are issued
//!
//! This module handles:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Pacing each access class through its own rate monitor
//! - Injecting credentials round-robin
//! - Classifying transport, request and decode failures

use super::credentials::CredentialPool;
use super::envelope::{decode_envelope, Envelope};
use super::rate::RateMonitor;
use super::{AccessClass, Params};
use crate::config::{ApiConfig, Config};
use crate::ConfigError;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failures of a single remote call
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Connection, DNS, timeout or body read failure
    #[error("network failure: {0}")]
    Network(String),

    /// The quota for the credential or endpoint is exhausted
    #[error("rate limited ({status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    RateLimited { status: u16, detail: Option<String> },

    /// The API rejected the request or failed to serve it
    #[error(
        "request failed ({status} {}): {}",
        .error_type.as_deref().unwrap_or("unknown"),
        .detail.as_deref().unwrap_or("no detail")
    )]
    Request {
        status: u16,
        error_type: Option<String>,
        detail: Option<String>,
    },

    /// A successful reply whose body or payload could not be understood
    #[error("undecodable response: {0}")]
    Decode(String),

    /// The endpoint URL could not be built from the path
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// No credentials are configured for the access class
    #[error("no credentials configured for {0} access")]
    Unconfigured(AccessClass),

    /// The run was cancelled while waiting
    #[error("cancelled")]
    Cancelled,
}

/// Something that can issue one API call
///
/// [`HttpGateway`] talks to the real service; tests substitute in-process fakes.
#[allow(async_fn_in_trait)]
pub trait Gateway {
    /// Issues exactly one attempt of `GET {base}/{path}?{params}` under `class`
    async fn call(
        &mut self,
        class: AccessClass,
        path: &str,
        params: &Params,
    ) -> Result<Envelope, RemoteError>;
}

#[derive(Debug)]
struct Lane {
    pool: CredentialPool,
    monitor: RateMonitor,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The API endpoint configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed gateway with one credential pool and rate monitor per access class
#[derive(Debug)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    lanes: HashMap<AccessClass, Lane>,
}

impl HttpGateway {
    /// Creates a gateway with no access classes configured
    pub fn new(client: Client, base_url: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(format!(
                "base_url '{}' cannot carry a path",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            lanes: HashMap::new(),
        })
    }

    /// Adds an access class paced for `hourly_quota` calls per credential
    pub fn with_class(mut self, pool: CredentialPool, hourly_quota: u32) -> Self {
        let monitor = RateMonitor::from_quota(hourly_quota, pool.len());
        tracing::debug!(
            "{} access: {} credential(s), one call every {:?}",
            pool.class(),
            pool.len(),
            monitor.interval()
        );
        self.lanes.insert(pool.class(), Lane { pool, monitor });
        self
    }

    /// Builds the gateway and every configured access class
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let client = build_http_client(&config.api)?;
        let mut gateway = Self::new(client, &config.api.base_url)?;

        if let Some(auth) = &config.authenticated {
            let pool = CredentialPool::from_authenticated(auth)?;
            gateway = gateway.with_class(pool, auth.hourly_quota);
        }
        if let Some(userless) = &config.userless {
            let pool = CredentialPool::from_userless(userless)?;
            gateway = gateway.with_class(pool, userless.hourly_quota);
        }

        Ok(gateway)
    }

    pub fn has_class(&self, class: AccessClass) -> bool {
        self.lanes.contains_key(&class)
    }

    fn endpoint_url(&self, path: &str, params: &Params) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(path.trim_start_matches('/').split('/'));
        url.query_pairs_mut().extend_pairs(params.iter());
        Ok(url)
    }
}

impl Gateway for HttpGateway {
    async fn call(
        &mut self,
        class: AccessClass,
        path: &str,
        params: &Params,
    ) -> Result<Envelope, RemoteError> {
        let lane = self
            .lanes
            .get_mut(&class)
            .ok_or(RemoteError::Unconfigured(class))?;

        lane.monitor.wait_for_slot().await;

        let mut params = params.clone();
        lane.pool.next_credential().apply(&mut params);

        let url = self.endpoint_url(path, &params)?;
        tracing::debug!("GET {} ({} access)", path, class);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(describe_transport_error(e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Network(describe_transport_error(e)))?;

        decode_envelope(status, &body)
    }
}

// reqwest errors print the full URL, which carries credentials.
fn describe_transport_error(error: reqwest::Error) -> String {
    if error.is_timeout() {
        return "request timeout".to_string();
    }
    let connect = error.is_connect();
    let error = error.without_url();
    if connect {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}

use crate::api::AccessClass;
use serde::Deserialize;

/// Main configuration structure for Venue-Trawler
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub authenticated: Option<AuthenticatedConfig>,
    #[serde(default)]
    pub userless: Option<UserlessConfig>,
    #[serde(default)]
    pub retry: RetryConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub monitor: Option<MonitorConfig>,
    pub output: OutputConfig,
}

/// Remote API endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiConfig {
    /// Origin plus version prefix, e.g. `https://api.foursquare.com/v2`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Authenticated access: OAuth tokens sharing one hourly quota each
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthenticatedConfig {
    /// Maximum queries per hour for a single token
    pub hourly_quota: u32,

    /// OAuth access tokens, used round-robin
    pub tokens: Vec<String>,
}

/// Userless access: client id/secret pairs sharing one hourly quota each
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserlessConfig {
    /// Maximum queries per hour for a single client
    pub hourly_quota: u32,

    /// Client credentials, used round-robin
    pub clients: Vec<ClientCredentialConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientCredentialConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Backoff settings for tenacious querying
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// First backoff sleep in seconds
    #[serde(default = "default_base_backoff_secs")]
    pub base_backoff_secs: f64,

    /// Upper bound for a single backoff sleep in seconds
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: f64,

    /// Status codes treated as transient server failures
    #[serde(default = "default_transient_statuses")]
    pub transient_statuses: Vec<u16>,

    /// Give up after this many consecutive rate-limit replies (unbounded if absent)
    #[serde(default)]
    pub max_rate_limited_retries: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_backoff_secs: default_base_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            transient_statuses: default_transient_statuses(),
            max_rate_limited_retries: None,
        }
    }
}

/// Venue discovery settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Region code stamped on every venue discovered by this crawl
    #[serde(default)]
    pub region: Option<String>,

    /// Points the frontier starts from
    pub seeds: Vec<CoordinateConfig>,

    /// Neighbour offset in degrees for fresh frontier points
    #[serde(default = "default_initial_delta")]
    pub initial_delta: f64,

    /// Halving stops at this offset in degrees
    #[serde(default = "default_min_delta")]
    pub min_delta: f64,

    /// Stop once the store holds this many venues
    #[serde(default = "default_target_count")]
    pub target_count: u64,

    /// Result limit passed to each nearby search
    #[serde(default = "default_search_limit")]
    pub limit: u32,

    /// Access class used for nearby searches
    #[serde(default = "default_search_access")]
    pub access: AccessClass,

    /// Fixed seed for frontier selection (random if absent)
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Check-in monitoring settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MonitorConfig {
    /// Region code of the venues to watch
    pub region: String,

    /// Centre of the watched area
    pub centre: CoordinateConfig,

    /// Radius of the watched area in degrees
    #[serde(default = "default_monitor_radius")]
    pub radius: f64,

    /// Only poll venues that show check-in activity
    #[serde(default = "default_true")]
    pub require_activity: bool,

    /// Pause between passes in seconds when monitoring continuously
    #[serde(default)]
    pub pass_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CoordinateConfig {
    pub lat: f64,
    pub lng: f64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Path to the KML export file
    #[serde(default = "default_kml_path")]
    pub kml_path: String,
}

fn default_base_url() -> String {
    "https://api.foursquare.com/v2".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("venue-trawler/{}", env!("CARGO_PKG_VERSION"))
}

fn default_base_backoff_secs() -> f64 {
    6.0
}

fn default_max_backoff_secs() -> f64 {
    300.0
}

fn default_transient_statuses() -> Vec<u16> {
    vec![500, 501, 502, 503, 504]
}

fn default_initial_delta() -> f64 {
    0.005
}

fn default_min_delta() -> f64 {
    0.0005
}

fn default_target_count() -> u64 {
    5000
}

fn default_search_limit() -> u32 {
    50
}

fn default_search_access() -> AccessClass {
    AccessClass::Userless
}

fn default_monitor_radius() -> f64 {
    0.25
}

fn default_true() -> bool {
    true
}

fn default_kml_path() -> String {
    "./venues.kml".to_string()
}

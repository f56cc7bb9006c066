//! Rate-controlled access to the remote location API
//!
//! Calls flow through three layers:
//! - [`Gateway`] paces each access class with a [`RateMonitor`], rotates credentials from a
//!   [`CredentialPool`] and classifies failures into [`RemoteError`]
//! - [`RetryPolicy`] re-issues transient failures on a capped exponential ladder
//! - [`ApiClient`] builds resource paths and extracts typed payloads

mod client;
mod credentials;
mod envelope;
mod gateway;
mod rate;
mod retry;

pub use client::{ApiClient, FRIENDS_PAGE_LIMIT};
pub use credentials::{Credential, CredentialPool};
pub use envelope::{decode_envelope, Envelope, Meta, RATE_LIMIT_ERROR_TYPE};
pub use gateway::{build_http_client, Gateway, HttpGateway, RemoteError};
pub use rate::RateMonitor;
pub use retry::RetryPolicy;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Query parameters for a single call, kept sorted so request URLs are stable
pub type Params = BTreeMap<String, String>;

/// The two quota classes offered by the API
///
/// Each class owns its own credentials and pacing; classes never share quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessClass {
    /// Calls made on behalf of a user with an OAuth token
    Authenticated,
    /// Calls made with an application's client id and secret
    Userless,
}

impl fmt::Display for AccessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessClass::Authenticated => write!(f, "authenticated"),
            AccessClass::Userless => write!(f, "userless"),
        }
    }
}

//! Higher-level API helpers
//!
//! Every helper goes through [`RetryPolicy::call_tenaciously`], so callers only ever see
//! terminal errors.

use super::envelope::Envelope;
use super::gateway::{Gateway, HttpGateway, RemoteError};
use super::retry::RetryPolicy;
use super::{AccessClass, Params};
use crate::config::Config;
use crate::geo::GeoPoint;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Page size used when listing a user's friends
pub const FRIENDS_PAGE_LIMIT: usize = 500;

/// Gateway plus retry policy, with path building and payload extraction
#[derive(Debug)]
pub struct ApiClient<G> {
    gateway: G,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl<G: Gateway> ApiClient<G> {
    pub fn new(gateway: G, retry: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            gateway,
            retry,
            cancel,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Issues a tenacious query for an arbitrary path
    pub async fn query(
        &mut self,
        class: AccessClass,
        path: &str,
        params: &Params,
    ) -> Result<Envelope, RemoteError> {
        self.retry
            .call_tenaciously(&mut self.gateway, class, path, params, &self.cancel)
            .await
    }

    /// Queries `/{resource}/{id}` or `/{resource}/{id}/{aspect}`
    pub async fn query_resource(
        &mut self,
        class: AccessClass,
        resource: &str,
        id: &str,
        aspect: Option<&str>,
        params: &Params,
    ) -> Result<Envelope, RemoteError> {
        let path = match aspect {
            Some(aspect) => format!("/{}/{}/{}", resource, id, aspect),
            None => format!("/{}/{}", resource, id),
        };
        self.query(class, &path, params).await
    }

    /// Queries an id-less routine such as `/venues/search`
    pub async fn query_routine(
        &mut self,
        class: AccessClass,
        resource: &str,
        routine: &str,
        params: &Params,
    ) -> Result<Envelope, RemoteError> {
        let path = format!("/{}/{}", resource, routine);
        self.query(class, &path, params).await
    }

    /// Nearby search around `point`; trending venues are discarded
    pub async fn find_venues_near(
        &mut self,
        class: AccessClass,
        point: GeoPoint,
        limit: u32,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut params = Params::new();
        params.insert("ll".to_string(), point.ll_param());
        params.insert("intent".to_string(), "checkin".to_string());
        params.insert("limit".to_string(), limit.to_string());

        let envelope = self.query_routine(class, "venues", "search", &params).await?;
        Ok(nearby_venues(&envelope.response))
    }

    /// Full venue details (userless)
    pub async fn venue(&mut self, venue_id: &str) -> Result<Value, RemoteError> {
        let envelope = self
            .query_resource(AccessClass::Userless, "venues", venue_id, None, &Params::new())
            .await?;
        take_member(envelope.response, "venue")
    }

    /// Check-ins currently at a venue (authenticated)
    pub async fn venue_here_now(&mut self, venue_id: &str) -> Result<Vec<Value>, RemoteError> {
        let envelope = self
            .query_resource(
                AccessClass::Authenticated,
                "venues",
                venue_id,
                Some("herenow"),
                &Params::new(),
            )
            .await?;
        let here_now = take_member(envelope.response, "hereNow")?;
        Ok(items_of(&here_now))
    }

    /// Every friend of a user, fetched page by page
    pub async fn friends_of(&mut self, user_id: &str) -> Result<Vec<Value>, RemoteError> {
        let mut friends = Vec::new();
        let mut offset = 0;

        loop {
            let mut params = Params::new();
            params.insert("limit".to_string(), FRIENDS_PAGE_LIMIT.to_string());
            params.insert("offset".to_string(), offset.to_string());

            let envelope = self
                .query_resource(
                    AccessClass::Authenticated,
                    "users",
                    user_id,
                    Some("friends"),
                    &params,
                )
                .await?;
            let page = take_member(envelope.response, "friends")?;
            let expected = page
                .get("count")
                .and_then(Value::as_u64)
                .ok_or_else(|| RemoteError::Decode("friends.count missing".to_string()))?;
            let items = items_of(&page);

            if items.is_empty() {
                if (friends.len() as u64) < expected {
                    tracing::debug!(
                        "friends of {}: empty page at offset {}, {} of {} collected",
                        user_id,
                        offset,
                        friends.len(),
                        expected
                    );
                }
                break;
            }

            friends.extend(items);
            if friends.len() as u64 >= expected {
                break;
            }
            offset += FRIENDS_PAGE_LIMIT;
        }

        Ok(friends)
    }

    /// A user's profile (authenticated)
    pub async fn user(&mut self, user_id: &str) -> Result<Value, RemoteError> {
        let envelope = self
            .query_resource(AccessClass::Authenticated, "users", user_id, None, &Params::new())
            .await?;
        take_member(envelope.response, "user")
    }
}

impl ApiClient<HttpGateway> {
    /// Builds a client that talks HTTP to the configured API
    pub fn from_config(config: &Config, cancel: CancellationToken) -> crate::Result<Self> {
        let gateway = HttpGateway::from_config(config)?;
        Ok(Self::new(gateway, RetryPolicy::from_config(&config.retry), cancel))
    }
}

/// Venues from a nearby search payload
///
/// The `nearby` group supplies the venues; a flat `venues` list is accepted as well.
fn nearby_venues(response: &Value) -> Vec<Value> {
    if let Some(groups) = response.get("groups").and_then(Value::as_array) {
        return groups
            .iter()
            .find(|group| group.get("type").and_then(Value::as_str) == Some("nearby"))
            .map(items_of)
            .unwrap_or_default();
    }

    response
        .get("venues")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn items_of(collection: &Value) -> Vec<Value> {
    collection
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn take_member(mut response: Value, key: &str) -> Result<Value, RemoteError> {
    match response.get_mut(key).map(Value::take) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(RemoteError::Decode(format!("response.{} missing", key))),
    }
}

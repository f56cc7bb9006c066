//! In-process fakes shared by unit tests

use crate::api::{AccessClass, Envelope, Gateway, Meta, Params, RemoteError};
use crate::geo::GeoPoint;
use serde_json::{json, Value};
use tokio::time::Instant;

/// A successful envelope wrapping `response`
pub fn envelope_ok(response: Value) -> Envelope {
    Envelope {
        meta: Meta {
            code: 200,
            error_type: None,
            error_detail: None,
        },
        notifications: Value::Null,
        response,
    }
}

/// One attempt seen by [`FnGateway`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub at: Instant,
    pub class: AccessClass,
    pub path: String,
    pub params: Params,
}

type Responder = Box<dyn FnMut(usize, &str, &Params) -> Result<Envelope, RemoteError>>;

/// Gateway whose replies come from a closure `(attempt index, path, params)`
pub struct FnGateway {
    responder: Responder,
    calls: Vec<RecordedCall>,
}

impl FnGateway {
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(usize, &str, &Params) -> Result<Envelope, RemoteError> + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }
}

impl std::fmt::Debug for FnGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnGateway")
            .field("calls", &self.calls.len())
            .finish()
    }
}

impl Gateway for FnGateway {
    async fn call(
        &mut self,
        class: AccessClass,
        path: &str,
        params: &Params,
    ) -> Result<Envelope, RemoteError> {
        let index = self.calls.len();
        self.calls.push(RecordedCall {
            at: Instant::now(),
            class,
            path: path.to_string(),
            params: params.clone(),
        });
        (self.responder)(index, path, params)
    }
}

/// Venue fixture in the shape the nearby search returns
pub fn venue_json(id: &str, lat: f64, lng: f64) -> Value {
    json!({
        "id": id,
        "name": format!("Venue {}", id),
        "location": {"lat": lat, "lng": lng},
        "verified": false,
        "categories": [{"id": "cat1", "name": "Cafe", "primary": true}],
        "stats": {"checkinsCount": 10, "usersCount": 4}
    })
}

/// Replies for a finite set of venues: those within `radius` degrees of the `ll` param
pub fn universe_responder(
    venues: Vec<(String, GeoPoint)>,
    radius: f64,
) -> impl FnMut(usize, &str, &Params) -> Result<Envelope, RemoteError> {
    move |_, _, params| {
        let centre = parse_ll(params.get("ll").map(String::as_str).unwrap_or_default());
        let items: Vec<Value> = venues
            .iter()
            .filter(|(_, at)| at.distance_deg(&centre) <= radius)
            .map(|(id, at)| venue_json(id, at.lat(), at.lng()))
            .collect();
        Ok(envelope_ok(json!({
            "groups": [{"type": "nearby", "name": "Nearby", "items": items}]
        })))
    }
}

/// Gateway over [`universe_responder`]
pub fn venue_universe(venues: Vec<(String, GeoPoint)>, radius: f64) -> FnGateway {
    FnGateway::new(universe_responder(venues, radius))
}

pub fn parse_ll(ll: &str) -> GeoPoint {
    let mut parts = ll.split(',').map(|s| s.parse::<f64>().unwrap());
    GeoPoint::new(parts.next().unwrap(), parts.next().unwrap())
}

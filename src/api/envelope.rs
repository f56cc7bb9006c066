//! Response envelope decoding and error classification

use super::RemoteError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `meta.errorType` value the API uses when a quota is exhausted
pub const RATE_LIMIT_ERROR_TYPE: &str = "rate_limit_exceeded";

/// The three top-level members of every API response
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub meta: Meta,
    #[serde(default)]
    pub notifications: Value,
    #[serde(default)]
    pub response: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub code: u16,
    #[serde(default, deserialize_with = "first_string")]
    pub error_type: Option<String>,
    #[serde(default, deserialize_with = "first_string")]
    pub error_detail: Option<String>,
}

/// Accepts `"x"`, `["x", ...]` or null; arrays yield their first element
fn first_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(
        match Option::<OneOrMany>::deserialize(deserializer)? {
            Some(OneOrMany::One(s)) => Some(s),
            Some(OneOrMany::Many(v)) => v.into_iter().next(),
            None => None,
        },
    )
}

/// Turns an HTTP status and body into an envelope or a classified error
///
/// | Body | HTTP status | meta.code | Result |
/// |------|-------------|-----------|--------|
/// | envelope | 2xx | 200 | `Ok` |
/// | envelope, `rate_limit_exceeded` | any | any | `RateLimited` |
/// | envelope | 429 | any | `RateLimited` |
/// | envelope | any | 429 | `RateLimited` |
/// | envelope, other error | any | any | `Request` with `meta.code` |
/// | not an envelope | 2xx | - | `Decode` |
/// | not an envelope | 429 | - | `RateLimited` |
/// | not an envelope | other | - | `Request` with the HTTP status |
pub fn decode_envelope(http_status: u16, body: &str) -> Result<Envelope, RemoteError> {
    let success = (200..300).contains(&http_status);

    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if success => return Err(RemoteError::Decode(e.to_string())),
        Err(_) if http_status == 429 => {
            return Err(RemoteError::RateLimited {
                status: http_status,
                detail: None,
            })
        }
        Err(_) => {
            return Err(RemoteError::Request {
                status: http_status,
                error_type: None,
                detail: None,
            })
        }
    };

    if envelope.meta.code == 200 && success {
        return Ok(envelope);
    }

    let Meta {
        code,
        error_type,
        error_detail,
    } = envelope.meta;

    // a 200 meta inside a failed HTTP exchange still reports the transport status
    let status = if code == 200 { http_status } else { code };

    if error_type.as_deref() == Some(RATE_LIMIT_ERROR_TYPE) || http_status == 429 || code == 429 {
        return Err(RemoteError::RateLimited {
            status,
            detail: error_detail,
        });
    }

    Err(RemoteError::Request {
        status,
        error_type,
        detail: error_detail,
    })
}

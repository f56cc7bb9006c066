//! Credentials and round-robin credential pools

use super::{AccessClass, Params};
use crate::config::{AuthenticatedConfig, UserlessConfig};
use crate::ConfigError;
use std::fmt;

/// Parameter names that carry authentication and are owned by the gateway
pub(crate) const AUTH_PARAMS: [&str; 3] = ["oauth_token", "client_id", "client_secret"];

/// One interchangeable set of authentication fields
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// OAuth access token (authenticated class)
    Token(String),
    /// Application id and secret (userless class)
    Client { id: String, secret: String },
}

impl Credential {
    /// Replaces any authentication fields in `params` with this credential's own
    pub fn apply(&self, params: &mut Params) {
        for key in AUTH_PARAMS {
            params.remove(key);
        }

        match self {
            Credential::Token(token) => {
                params.insert("oauth_token".to_string(), token.clone());
            }
            Credential::Client { id, secret } => {
                params.insert("client_id".to_string(), id.clone());
                params.insert("client_secret".to_string(), secret.clone());
            }
        }
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Token(_) => f.write_str("Token(<redacted>)"),
            Credential::Client { id, .. } => f
                .debug_struct("Client")
                .field("id", id)
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Fixed-order pool of credentials for one access class
#[derive(Debug, Clone)]
pub struct CredentialPool {
    class: AccessClass,
    credentials: Vec<Credential>,
    cursor: usize,
}

impl CredentialPool {
    /// Creates a pool; an empty credential list is rejected
    pub fn new(class: AccessClass, credentials: Vec<Credential>) -> Result<Self, ConfigError> {
        if credentials.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} credential pool cannot be empty",
                class
            )));
        }

        Ok(Self {
            class,
            credentials,
            cursor: 0,
        })
    }

    pub fn from_authenticated(config: &AuthenticatedConfig) -> Result<Self, ConfigError> {
        let credentials = config.tokens.iter().cloned().map(Credential::Token).collect();
        Self::new(AccessClass::Authenticated, credentials)
    }

    pub fn from_userless(config: &UserlessConfig) -> Result<Self, ConfigError> {
        let credentials = config
            .clients
            .iter()
            .map(|c| Credential::Client {
                id: c.client_id.clone(),
                secret: c.client_secret.clone(),
            })
            .collect();
        Self::new(AccessClass::Userless, credentials)
    }

    /// Returns the credential under the cursor and advances it
    ///
    /// Any window of `len()` consecutive calls yields every credential exactly once.
    pub fn next_credential(&mut self) -> &Credential {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.credentials.len();
        &self.credentials[index]
    }

    pub fn class(&self) -> AccessClass {
        self.class
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

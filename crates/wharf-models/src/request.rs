//! The validated token request and the caller credentials it carries.
//!
//! A [`TokenRequest`] is built once per inbound call by the request parser
//! and never mutated afterwards. Credentials that the transport could not
//! supply are `None`, never an empty placeholder.

use std::fmt;
use std::net::IpAddr;

use serde::Serialize;

use crate::error::ValidationError;
use crate::scope::ScopeSet;

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// Correlation id assigned to a request when it is received.
///
/// Every result produced while handling the request carries the same id so
/// that log lines across the whole pipeline can be joined.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Wrap an opaque id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Username and password from an HTTP Basic `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Username part (before the first `:`).
    pub username: String,
    /// Password part (everything after the first `:`).
    pub password: String,
}

impl BasicCredentials {
    /// Build credentials from a username / password pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Address of the peer that opened the connection.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionCredentials {
    /// Remote IP address.
    pub address: IpAddr,
    /// Remote port.
    pub port: u16,
}

/// A refresh token presented in place of a password.
///
/// Reserved: nothing in the pipeline produces or consumes it yet.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshTokenCredentials {
    /// The opaque refresh token.
    pub token: String,
}

impl fmt::Debug for RefreshTokenCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshTokenCredentials(<redacted>)")
    }
}

/// Everything the transport could tell us about who is calling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Basic credentials, when a well-formed Basic header was present.
    pub basic: Option<BasicCredentials>,
    /// Peer address, when the transport exposes it.
    pub connection: Option<ConnectionCredentials>,
    /// Refresh-token credentials (always `None` for now).
    pub refresh_token: Option<RefreshTokenCredentials>,
    /// Whether an `Authorization` header was sent at all, even one that
    /// could not be decoded into [`basic`](Self::basic).
    pub authorization_presented: bool,
}

// ---------------------------------------------------------------------------
// TokenRequest
// ---------------------------------------------------------------------------

/// Name of the service (token audience) a request is for.
///
/// Guaranteed non-empty.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    /// Validate and wrap a service name.
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::MissingField {
                field: "service".to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated, immutable request for a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    /// Correlation id.
    pub id: RequestId,
    /// Target service (token audience).
    pub service: ServiceName,
    /// Account the client asks the token for.
    pub account: Option<String>,
    /// Client identifier supplied by the caller.
    pub client_id: Option<String>,
    /// Whether the client asked for an offline (refresh) token.
    pub offline_token: bool,
    /// Requested scopes.
    pub scopes: ScopeSet,
    /// Caller credentials.
    pub credentials: Credentials,
}

impl TokenRequest {
    /// A request with only a service name and no credentials.
    pub fn new(id: RequestId, service: ServiceName) -> Self {
        Self {
            id,
            service,
            account: None,
            client_id: None,
            offline_token: false,
            scopes: ScopeSet::new(),
            credentials: Credentials::default(),
        }
    }

    /// A request that only establishes identity: no account and no scopes.
    ///
    /// Such requests skip the authorization stage entirely.
    pub fn is_anonymous(&self) -> bool {
        self.account.is_none() && self.scopes.is_empty()
    }
}

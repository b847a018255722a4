//! Pre-signing description of an access token.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::request::ServiceName;
use crate::scope::ScopeSet;

/// What an issued token will assert, before it is signed.
///
/// Built only for requests that passed both authentication and
/// authorization; `scopes` is exactly the final authorized set.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TokenDefinition {
    /// Unique token id (becomes the JWT `jti`).
    pub id: String,
    /// Token issuer.
    pub issuer: String,
    /// Authenticated account, `None` for anonymous callers.
    pub subject: Option<String>,
    /// Service the token is valid for.
    pub audience: ServiceName,
    /// Granted scopes.
    pub scopes: ScopeSet,
    /// Issue instant.
    pub issued_at: DateTime<Utc>,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

impl TokenDefinition {
    /// Time between issue and expiry.
    pub fn lifetime(&self) -> Duration {
        self.expires_at - self.issued_at
    }
}

//! JWT token signing.
//!
//! Encodes a [`TokenDefinition`] as a registry-style bearer token: the
//! standard registered claims plus an `access` array listing every granted
//! resource and its actions.

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use wharf_auth::{ProviderError, Signer};
use wharf_models::TokenDefinition;

// ---------------------------------------------------------------------------
// Claim types
// ---------------------------------------------------------------------------

/// Claims of an issued token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,
    /// Authenticated account; absent for anonymous tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Service the token is for.
    pub aud: String,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Not before (seconds since epoch).
    pub nbf: i64,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Token id.
    pub jti: String,
    /// Granted access.
    pub access: Vec<AccessEntry>,
}

/// One granted resource.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessEntry {
    /// Resource type, e.g. `repository`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource name.
    pub name: String,
    /// Granted actions.
    pub actions: Vec<String>,
}

impl From<&TokenDefinition> for TokenClaims {
    fn from(def: &TokenDefinition) -> Self {
        Self {
            iss: def.issuer.clone(),
            sub: def.subject.clone(),
            aud: def.audience.to_string(),
            exp: def.expires_at.timestamp(),
            nbf: def.issued_at.timestamp(),
            iat: def.issued_at.timestamp(),
            jti: def.id.clone(),
            access: def
                .scopes
                .iter()
                .map(|scope| AccessEntry {
                    resource_type: scope.resource_type().to_string(),
                    name: scope.resource_name().to_string(),
                    actions: scope.actions().map(str::to_string).collect(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// Signs token definitions as HMAC-SHA256 JWTs.
pub struct JwtSigner {
    header: Header,
    key: EncodingKey,
}

impl JwtSigner {
    /// Signer using a shared HMAC secret.
    pub fn hs256(secret: &[u8]) -> Self {
        Self {
            header: Header::new(Algorithm::HS256),
            key: EncodingKey::from_secret(secret),
        }
    }
}

#[async_trait]
impl Signer for JwtSigner {
    fn algorithm(&self) -> &str {
        "HS256"
    }

    async fn sign(&self, definition: &TokenDefinition) -> Result<String, ProviderError> {
        let claims = TokenClaims::from(definition);
        encode(&self.header, &claims, &self.key).map_err(|e| ProviderError::Internal(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

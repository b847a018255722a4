//! Outcomes of the authentication and authorization stages.
//!
//! Both result types carry the [`RequestId`] of the request they were
//! produced for. They are plain values: every stage builds a new result
//! instead of mutating the previous one.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::request::{RequestId, TokenRequest};
use crate::scope::ScopeSet;

// ---------------------------------------------------------------------------
// AuthenticationResult
// ---------------------------------------------------------------------------

/// Outcome of authenticating the caller of a [`TokenRequest`].
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AuthenticationResult {
    /// Correlation id of the request.
    pub request_id: RequestId,
    /// Whether the caller was authenticated.
    pub successful: bool,
    /// Resolved account identity. `None` for anonymous callers and failures.
    pub account: Option<String>,
    /// Opaque data a strategy wants to hand to authorization providers.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AuthenticationResult {
    /// A successful result for `account` (or an anonymous caller when `None`).
    pub fn success(request_id: RequestId, account: Option<String>) -> Self {
        Self {
            request_id,
            successful: true,
            account,
            metadata: BTreeMap::new(),
        }
    }

    /// A failed result.
    pub fn failure(request_id: RequestId) -> Self {
        Self {
            request_id,
            successful: false,
            account: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// AuthorizationResult
// ---------------------------------------------------------------------------

/// Split of the requested scopes into granted and denied ones.
///
/// The two sets are always disjoint. A result is successful only when
/// nothing is left in [`forbidden`](Self::forbidden).
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AuthorizationResult {
    /// Correlation id of the request.
    pub request_id: RequestId,
    /// Scopes granted so far.
    pub authorized: ScopeSet,
    /// Scopes not granted (yet).
    pub forbidden: ScopeSet,
}

impl AuthorizationResult {
    /// A result with both sets empty.
    pub fn empty(request_id: RequestId) -> Self {
        Self {
            request_id,
            authorized: ScopeSet::new(),
            forbidden: ScopeSet::new(),
        }
    }

    /// The starting point of a provider chain: every requested scope is denied.
    pub fn deny_all(request: &TokenRequest) -> Self {
        Self {
            request_id: request.id.clone(),
            authorized: ScopeSet::new(),
            forbidden: request.scopes.clone(),
        }
    }

    /// A partial decision granting `authorized` and saying nothing else.
    pub fn grant(request_id: RequestId, authorized: ScopeSet) -> Self {
        Self {
            request_id,
            authorized,
            forbidden: ScopeSet::new(),
        }
    }

    /// Whether every requested scope has been granted.
    pub fn is_successful(&self) -> bool {
        self.forbidden.is_empty()
    }

    /// Merge a partial decision into this accumulator.
    ///
    /// Grants only ever grow: the new `authorized` set is the union of both
    /// sides, and anything now authorized is removed from `forbidden`. A
    /// partial result cannot move a granted scope back into `forbidden`.
    pub fn combine(&self, partial: &AuthorizationResult) -> AuthorizationResult {
        let authorized = self.authorized.union(&partial.authorized);
        let forbidden = self.forbidden.difference(&authorized);
        AuthorizationResult {
            request_id: self.request_id.clone(),
            authorized,
            forbidden,
        }
    }
}

//! Collaborator doubles shared by the unit tests of this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wharf_models::{
    AuthenticationResult, AuthorizationResult, RequestId, Scope, ScopeSet, ServiceName,
    TokenDefinition, TokenRequest,
};

use crate::error::ProviderError;
use crate::provider::{AuthenticationStrategy, AuthorizationProvider, Signer};

pub fn scopes(items: &[&str]) -> ScopeSet {
    items.iter().map(|s| Scope::parse(s).unwrap()).collect()
}

pub fn request(requested: &[&str]) -> TokenRequest {
    let mut req = TokenRequest::new(
        RequestId::new("req-1"),
        ServiceName::new("registry.example.com").unwrap(),
    );
    req.scopes = scopes(requested);
    req
}

pub fn authenticated(account: Option<&str>) -> AuthenticationResult {
    AuthenticationResult::success(RequestId::new("req-1"), account.map(str::to_string))
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

pub enum StaticStrategy {
    Allow(Option<String>),
    Reject,
    Error(ProviderError),
    Stall(Duration),
}

impl StaticStrategy {
    pub fn allow(account: Option<&str>) -> Self {
        Self::Allow(account.map(str::to_string))
    }

    pub fn reject() -> Self {
        Self::Reject
    }

    pub fn error(err: ProviderError) -> Self {
        Self::Error(err)
    }
}

#[async_trait]
impl AuthenticationStrategy for StaticStrategy {
    async fn authenticate(&self, request: &TokenRequest) -> Result<AuthenticationResult, ProviderError> {
        match self {
            Self::Allow(account) => Ok(AuthenticationResult::success(request.id.clone(), account.clone())),
            Self::Reject => Ok(AuthenticationResult::failure(request.id.clone())),
            Self::Error(err) => Err(err.clone()),
            Self::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(AuthenticationResult::success(request.id.clone(), None))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// What a [`TestProvider`] does when called.
pub enum Behaviour {
    /// Grant exactly these scopes.
    Grant(ScopeSet),
    /// Grant everything still forbidden.
    GrantAll,
    /// Grant nothing and claim every requested scope is forbidden.
    DenyAll,
    /// Fail.
    Fail,
    /// Sleep, then grant everything.
    Stall(Duration),
}

pub struct TestProvider {
    name: String,
    behaviour: Behaviour,
    calls: AtomicUsize,
    seen_forbidden: Mutex<Vec<ScopeSet>>,
}

impl TestProvider {
    pub fn new(name: &str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behaviour,
            calls: AtomicUsize::new(0),
            seen_forbidden: Mutex::new(Vec::new()),
        })
    }

    pub fn grant(name: &str, items: &[&str]) -> Arc<Self> {
        Self::new(name, Behaviour::Grant(scopes(items)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_forbidden(&self) -> Vec<ScopeSet> {
        self.seen_forbidden.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationProvider for TestProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn decide(
        &self,
        request: &TokenRequest,
        _authn: &AuthenticationResult,
        current: &AuthorizationResult,
    ) -> Result<AuthorizationResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_forbidden.lock().unwrap().push(current.forbidden.clone());

        match &self.behaviour {
            Behaviour::Grant(granted) => Ok(AuthorizationResult::grant(request.id.clone(), granted.clone())),
            Behaviour::GrantAll => Ok(AuthorizationResult::grant(
                request.id.clone(),
                current.forbidden.clone(),
            )),
            Behaviour::DenyAll => Ok(AuthorizationResult::deny_all(request)),
            Behaviour::Fail => Err(ProviderError::Internal(format!("{} exploded", self.name))),
            Behaviour::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(AuthorizationResult::grant(request.id.clone(), current.forbidden.clone()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

pub struct StubSigner {
    fail: bool,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StubSigner {
    fn build(fail: bool, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            fail,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::build(false, None)
    }

    pub fn failing() -> Arc<Self> {
        Self::build(true, None)
    }

    /// Sleeps for `delay` before signing.
    pub fn stalling(delay: Duration) -> Arc<Self> {
        Self::build(false, Some(delay))
    }
}

#[async_trait]
impl Signer for StubSigner {
    fn algorithm(&self) -> &str {
        "none"
    }

    async fn sign(&self, definition: &TokenDefinition) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProviderError::Unavailable("key vault".into()));
        }
        Ok(format!(
            "signed:{}:{}",
            definition.audience,
            definition.scopes.to_strings().join(" ")
        ))
    }
}

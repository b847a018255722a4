//! Composite authentication strategy.

use std::sync::Arc;

use async_trait::async_trait;
use wharf_auth::{AuthenticationStrategy, ProviderError};
use wharf_models::{AuthenticationResult, TokenRequest};

/// Tries strategies in order; the first successful result wins.
///
/// An error from any strategy is returned immediately. When no strategy
/// succeeds the result is a failure.
#[derive(Clone, Default)]
pub struct AuthenticationChain {
    strategies: Vec<Arc<dyn AuthenticationStrategy>>,
}

impl AuthenticationChain {
    /// An empty chain (rejects everyone).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy.
    pub fn with(mut self, strategy: Arc<dyn AuthenticationStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }
}

#[async_trait]
impl AuthenticationStrategy for AuthenticationChain {
    async fn authenticate(&self, request: &TokenRequest) -> Result<AuthenticationResult, ProviderError> {
        for strategy in &self.strategies {
            let result = strategy.authenticate(request).await?;
            if result.successful {
                return Ok(result);
            }
        }
        Ok(AuthenticationResult::failure(request.id.clone()))
    }
}

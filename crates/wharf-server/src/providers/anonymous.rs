//! Authentication for callers that present nothing.

use async_trait::async_trait;
use wharf_auth::{AuthenticationStrategy, ProviderError};
use wharf_models::{AuthenticationResult, TokenRequest};

/// Succeeds, without an account, for requests that send no
/// `Authorization` header and name no account. A wrong password or an
/// undecodable header never falls back to anonymous access.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthentication;

#[async_trait]
impl AuthenticationStrategy for AnonymousAuthentication {
    async fn authenticate(&self, request: &TokenRequest) -> Result<AuthenticationResult, ProviderError> {
        let creds = &request.credentials;
        if creds.authorization_presented || creds.basic.is_some() || request.account.is_some() {
            return Ok(AuthenticationResult::failure(request.id.clone()));
        }
        Ok(AuthenticationResult::success(request.id.clone(), None)
            .with_metadata("method", serde_json::json!("anonymous")))
    }
}

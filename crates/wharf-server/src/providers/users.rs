//! Basic-credential authentication against a fixed user table.

use std::collections::HashMap;

use async_trait::async_trait;
use subtle::ConstantTimeEq;
use tracing::debug;
use wharf_auth::{AuthenticationStrategy, ProviderError};
use wharf_models::{AuthenticationResult, TokenRequest};

/// Accepts callers whose Basic credentials match the configured table.
///
/// When the request names an `account`, it must be the authenticated user.
/// Requests without Basic credentials are rejected.
#[derive(Debug, Clone, Default)]
pub struct StaticUserAuthentication {
    users: HashMap<String, String>,
}

impl StaticUserAuthentication {
    /// Build from a `username → password` table.
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    fn password_matches(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected.as_bytes().ct_eq(password.as_bytes()).into())
    }
}

#[async_trait]
impl AuthenticationStrategy for StaticUserAuthentication {
    async fn authenticate(&self, request: &TokenRequest) -> Result<AuthenticationResult, ProviderError> {
        let Some(basic) = &request.credentials.basic else {
            return Ok(AuthenticationResult::failure(request.id.clone()));
        };

        if !self.password_matches(&basic.username, &basic.password) {
            debug!(username = %basic.username, "unknown user or wrong password");
            return Ok(AuthenticationResult::failure(request.id.clone()));
        }

        if request.account.as_deref().is_some_and(|account| account != basic.username) {
            debug!(
                username = %basic.username,
                account = ?request.account,
                "requested account does not match credentials"
            );
            return Ok(AuthenticationResult::failure(request.id.clone()));
        }

        Ok(
            AuthenticationResult::success(request.id.clone(), Some(basic.username.clone()))
                .with_metadata("method", serde_json::json!("basic")),
        )
    }
}

//! Authentication stage.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use wharf_models::{AuthenticationResult, TokenRequest};

use crate::error::Fault;
use crate::provider::{call, AuthenticationStrategy};

/// Runs the configured [`AuthenticationStrategy`] for every request.
///
/// Anonymous requests are authenticated too; the strategy decides whether
/// a caller without credentials is acceptable.
#[derive(Clone)]
pub struct Authenticator {
    strategy: Arc<dyn AuthenticationStrategy>,
    call_timeout: Option<Duration>,
}

impl Authenticator {
    /// Wrap a strategy. `call_timeout` bounds each call when set.
    pub fn new(strategy: Arc<dyn AuthenticationStrategy>, call_timeout: Option<Duration>) -> Self {
        Self {
            strategy,
            call_timeout,
        }
    }

    /// Authenticate the caller of `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the strategy fails or times out. A rejected
    /// caller is an `Ok` result with `successful == false`.
    pub async fn authenticate(&self, request: &TokenRequest) -> Result<AuthenticationResult, Fault> {
        let result = call(
            || "authentication strategy".to_string(),
            self.call_timeout,
            self.strategy.authenticate(request),
        )
        .await?;

        if result.successful {
            debug!(account = ?result.account, "request authenticated");
        } else {
            warn!(
                username = ?request.credentials.basic.as_ref().map(|b| b.username.as_str()),
                "failed to authenticate request"
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::test_support::{request, StaticStrategy};

    #[tokio::test]
    async fn success_is_passed_through() {
        let auth = Authenticator::new(Arc::new(StaticStrategy::allow(Some("alice"))), None);
        let res = auth.authenticate(&request(&[])).await.unwrap();
        assert!(res.successful);
        assert_eq!(res.account.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn rejection_is_not_an_error() {
        let auth = Authenticator::new(Arc::new(StaticStrategy::reject()), None);
        let res = auth.authenticate(&request(&[])).await.unwrap();
        assert!(!res.successful);
    }

    #[tokio::test]
    async fn strategy_errors_become_faults() {
        let auth = Authenticator::new(
            Arc::new(StaticStrategy::error(ProviderError::Unavailable("ldap".into()))),
            None,
        );
        let err = auth.authenticate(&request(&[])).await.unwrap_err();
        assert_eq!(
            err,
            Fault::Dependency {
                collaborator: "authentication strategy".into(),
                source: ProviderError::Unavailable("ldap".into()),
            }
        );
    }
}

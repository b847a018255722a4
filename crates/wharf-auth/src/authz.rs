//! Authorization stage: folds the decisions of an ordered provider chain
//! into one [`AuthorizationResult`].
//!
//! The accumulator starts with every requested scope forbidden. Providers
//! run strictly one after another, each seeing the accumulator left by the
//! ones before it, and each result is merged with
//! [`AuthorizationResult::combine`]. Merging only ever adds grants, so a
//! later provider cannot take back what an earlier one granted. The chain
//! stops as soon as nothing is forbidden any more; providers that should be
//! authoritative (or are cheap) belong at the front.
//!
//! A provider that fails aborts the request. It is never read as an
//! implicit allow or deny.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use wharf_models::{AuthenticationResult, AuthorizationResult, TokenRequest};

use crate::error::Fault;
use crate::provider::{call, AuthorizationProvider};

/// Runs the configured chain of [`AuthorizationProvider`]s.
#[derive(Clone, Default)]
pub struct Authorizer {
    providers: Vec<Arc<dyn AuthorizationProvider>>,
    call_timeout: Option<Duration>,
}

impl Authorizer {
    /// Chain the providers in the given order.
    pub fn new(providers: Vec<Arc<dyn AuthorizationProvider>>, call_timeout: Option<Duration>) -> Self {
        Self {
            providers,
            call_timeout,
        }
    }

    /// Names of the configured providers, in chain order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Decide which requested scopes are granted.
    ///
    /// Anonymous requests (no account, no scopes) get an empty, successful
    /// result without any provider being called. A result with a non-empty
    /// `forbidden` set is returned as `Ok`; it is up to the caller to reject.
    ///
    /// # Errors
    ///
    /// - [`Fault::InvariantViolation`] if `authn` is not successful
    /// - [`Fault::Dependency`] / [`Fault::Timeout`] when a provider fails
    pub async fn authorize(
        &self,
        request: &TokenRequest,
        authn: &AuthenticationResult,
    ) -> Result<AuthorizationResult, Fault> {
        if !authn.successful {
            error!("authorization invoked for an unauthenticated request");
            return Err(Fault::InvariantViolation(format!(
                "cannot authorize unauthenticated request {}",
                request.id
            )));
        }

        if request.is_anonymous() {
            debug!("anonymous request, skipping authorization");
            return Ok(AuthorizationResult::empty(request.id.clone()));
        }

        let mut acc = AuthorizationResult::deny_all(request);

        for provider in &self.providers {
            if acc.is_successful() {
                break;
            }

            let partial = call(
                || format!("authorization provider `{}`", provider.name()),
                self.call_timeout,
                provider.decide(request, authn, &acc),
            )
            .await?;

            // Grants are limited to what was asked for.
            let granted = partial.authorized.intersection(&request.scopes);
            if granted.len() != partial.authorized.len() {
                warn!(
                    provider = provider.name(),
                    unrequested = ?partial.authorized.difference(&request.scopes).to_strings(),
                    "provider granted scopes that were not requested; ignoring them"
                );
            }

            acc = acc.combine(&AuthorizationResult::grant(request.id.clone(), granted));

            debug!(
                provider = provider.name(),
                authorized = ?acc.authorized.to_strings(),
                forbidden = ?acc.forbidden.to_strings(),
                "provider decision merged"
            );
        }

        if acc.is_successful() {
            info!(scopes = ?acc.authorized.to_strings(), "request authorized");
        } else {
            warn!(
                forbidden = ?acc.forbidden.to_strings(),
                "failed to authorize requested scopes"
            );
        }

        Ok(acc)
    }
}

//! Collaborator interfaces consumed by the pipeline.
//!
//! Concrete implementations live outside this crate and are injected when
//! the pipeline is built. One instance serves many requests at once, so
//! every implementation must be safe to call concurrently.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use wharf_models::{AuthenticationResult, AuthorizationResult, TokenDefinition, TokenRequest};

use crate::error::{Fault, ProviderError};

/// Validates the caller of a token request.
#[async_trait]
pub trait AuthenticationStrategy: Send + Sync {
    /// Authenticate the caller.
    ///
    /// Bad credentials are reported as an unsuccessful
    /// [`AuthenticationResult`], not as an error.
    ///
    /// # Errors
    ///
    /// - `Unavailable` when a backing store cannot be reached
    /// - `Internal` for unexpected errors
    async fn authenticate(&self, request: &TokenRequest) -> Result<AuthenticationResult, ProviderError>;
}

/// One link of the ordered authorization chain.
///
/// A provider sees the accumulator left by the providers before it and
/// returns the scopes it grants. Whatever it puts in `forbidden` is
/// ignored: only grants are merged, and an earlier grant cannot be
/// revoked.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Name used in logs and fault messages.
    fn name(&self) -> &str;

    /// Decide which of the still-forbidden scopes to grant.
    ///
    /// # Errors
    ///
    /// - `Unavailable` when a backing store cannot be reached
    /// - `Internal` for unexpected errors
    async fn decide(
        &self,
        request: &TokenRequest,
        authn: &AuthenticationResult,
        current: &AuthorizationResult,
    ) -> Result<AuthorizationResult, ProviderError>;
}

/// Turns a token definition into an opaque signed string.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Signing algorithm identifier, e.g. `HS256`.
    fn algorithm(&self) -> &str;

    /// Sign the definition.
    ///
    /// # Errors
    ///
    /// - `Unavailable` when key material cannot be reached
    /// - `Internal` for encoding failures
    async fn sign(&self, definition: &TokenDefinition) -> Result<String, ProviderError>;
}

/// Await a collaborator call, bounded by `deadline` when one is set.
///
/// Errors become [`Fault::Dependency`], an elapsed deadline becomes
/// [`Fault::Timeout`]. Dropping the returned future drops the inner call.
pub(crate) async fn call<T, F>(
    collaborator: impl FnOnce() -> String,
    deadline: Option<Duration>,
    fut: F,
) -> Result<T, Fault>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    let outcome = match deadline {
        Some(after) => match tokio::time::timeout(after, fut).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return Err(Fault::Timeout {
                    collaborator: collaborator(),
                    after,
                });
            }
        },
        None => fut.await,
    };

    outcome.map_err(|source| Fault::Dependency {
        collaborator: collaborator(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn call_passes_values_through() {
        let out = call(|| "signer".into(), None, async { Ok::<_, ProviderError>(7) }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn call_wraps_errors_as_dependency_faults() {
        let out: Result<(), Fault> = call(
            || "signer".into(),
            Some(Duration::from_secs(5)),
            async { Err(ProviderError::Internal("boom".into())) },
        )
        .await;
        assert_eq!(
            out,
            Err(Fault::Dependency {
                collaborator: "signer".into(),
                source: ProviderError::Internal("boom".into()),
            })
        );
    }

    #[tokio::test]
    async fn call_enforces_the_deadline() {
        let out: Result<(), Fault> = call(
            || "signer".into(),
            Some(Duration::from_millis(10)),
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            },
        )
        .await;
        assert!(matches!(out, Err(Fault::Timeout { .. })));
    }
}

//! Token issuance: builds a [`TokenDefinition`] from the outcome of the
//! earlier stages and hands it to the configured [`Signer`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{error, info};
use wharf_models::{AuthenticationResult, AuthorizationResult, TokenDefinition, TokenRequest};

use crate::error::{ConfigError, Fault};
use crate::provider::{call, Signer};

/// Issuer name and lifetime stamped on every token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOptions {
    issuer: String,
    lifetime: Duration,
    lifetime_delta: TimeDelta,
}

impl TokenOptions {
    /// Validate issuer and lifetime.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidIssuer`] for an empty issuer
    /// - [`ConfigError::InvalidLifetime`] for a zero lifetime, or one whose
    ///   expiry would fall outside the representable date range
    pub fn new(issuer: impl Into<String>, lifetime: Duration) -> Result<Self, ConfigError> {
        let issuer = issuer.into();
        if issuer.is_empty() {
            return Err(ConfigError::InvalidIssuer);
        }
        if lifetime.is_zero() {
            return Err(ConfigError::InvalidLifetime(lifetime));
        }
        let lifetime_delta = TimeDelta::from_std(lifetime)
            .ok()
            .filter(|delta| Utc::now().checked_add_signed(*delta).is_some())
            .ok_or(ConfigError::InvalidLifetime(lifetime))?;

        Ok(Self {
            issuer,
            lifetime,
            lifetime_delta,
        })
    }

    /// Token issuer.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Token lifetime.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

/// A signed token together with the definition it was signed from.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// What the token asserts.
    pub definition: TokenDefinition,
    /// The signed, encoded token.
    pub token: String,
}

/// Builds and signs tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    options: TokenOptions,
    signer: Arc<dyn Signer>,
    call_timeout: Option<Duration>,
}

impl TokenIssuer {
    /// Create an issuer. `call_timeout` bounds each signer call when set.
    pub fn new(options: TokenOptions, signer: Arc<dyn Signer>, call_timeout: Option<Duration>) -> Self {
        Self {
            options,
            signer,
            call_timeout,
        }
    }

    /// Issuer options in use.
    pub fn options(&self) -> &TokenOptions {
        &self.options
    }

    /// Algorithm of the configured signer.
    pub fn algorithm(&self) -> &str {
        self.signer.algorithm()
    }

    /// Build the definition of a token issued at `now`.
    ///
    /// # Errors
    ///
    /// [`Fault::InvariantViolation`] when `now` plus the lifetime is past the
    /// last representable instant.
    pub fn define(
        &self,
        request: &TokenRequest,
        authn: &AuthenticationResult,
        authz: &AuthorizationResult,
        now: DateTime<Utc>,
    ) -> Result<TokenDefinition, Fault> {
        let expires_at = now
            .checked_add_signed(self.options.lifetime_delta)
            .ok_or_else(|| {
                Fault::InvariantViolation(format!(
                    "token expiry out of range for request {} issued at {now}",
                    request.id
                ))
            })?;

        Ok(TokenDefinition {
            id: uuid::Uuid::new_v4().to_string(),
            issuer: self.options.issuer.clone(),
            subject: authn.account.clone(),
            audience: request.service.clone(),
            scopes: authz.authorized.clone(),
            issued_at: now,
            expires_at,
        })
    }

    /// Define and sign a token for a fully authenticated and authorized request.
    ///
    /// # Errors
    ///
    /// - [`Fault::InvariantViolation`] if authentication or authorization did
    ///   not succeed
    /// - [`Fault::Dependency`] / [`Fault::Timeout`] when the signer fails
    pub async fn issue(
        &self,
        request: &TokenRequest,
        authn: &AuthenticationResult,
        authz: &AuthorizationResult,
    ) -> Result<IssuedToken, Fault> {
        if !authn.successful || !authz.is_successful() {
            error!("token issuance invoked before authentication and authorization succeeded");
            return Err(Fault::InvariantViolation(format!(
                "cannot issue a token for request {} without full authorization",
                request.id
            )));
        }

        let definition = self.define(request, authn, authz, Utc::now())?;
        let token = call(
            || "token signer".to_string(),
            self.call_timeout,
            self.signer.sign(&definition),
        )
        .await?;

        info!(
            jti = %definition.id,
            subject = ?definition.subject,
            audience = %definition.audience,
            scopes = ?definition.scopes.to_strings(),
            expires_at = %definition.expires_at,
            "token issued"
        );

        Ok(IssuedToken { definition, token })
    }
}

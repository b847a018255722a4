//! Failure taxonomy of the token pipeline.
//!
//! The pipeline distinguishes four kinds of failure:
//!
//! * [`ConfigError`]: the pipeline was assembled incorrectly; raised once at
//!   startup, never per request.
//! * [`ProviderError`]: the only error a collaborator (authentication
//!   strategy, authorization provider, signer) may return. Denying access
//!   is a decision, not an error.
//! * [`Rejection`]: the request is refused for a reason the caller can act
//!   on (wrong method, bad input, bad credentials, forbidden scopes).
//! * [`Fault`]: something on our side broke: a collaborator failed or timed
//!   out, or a stage was called in a state that must never happen.

use std::time::Duration;

use http::Method;
use wharf_models::{ScopeSet, ValidationError};

/// Errors detected while assembling a [`TokenPipeline`](crate::TokenPipeline).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No authentication strategy was configured.
    #[error("no authentication strategy configured")]
    MissingAuthentication,

    /// No token signer was configured.
    #[error("no token signer configured")]
    MissingSigner,

    /// The token issuer is empty.
    #[error("token issuer must not be empty")]
    InvalidIssuer,

    /// The token lifetime is zero or too large to represent.
    #[error("invalid token lifetime: {0:?}")]
    InvalidLifetime(Duration),
}

/// Errors a collaborator can report back to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// A backing service could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected error inside the collaborator.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A request refused for a reason the caller can act on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    /// The request did not use the read method.
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    /// The request was malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller could not be authenticated.
    #[error("unauthorized")]
    Unauthenticated,

    /// Some requested scopes were not granted by any provider.
    #[error("forbidden scopes: {}", .0.to_strings().join(" "))]
    Forbidden(ScopeSet),
}

/// An unexpected failure that aborts the request with a server error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Fault {
    /// A collaborator returned an error.
    #[error("{collaborator} failed: {source}")]
    Dependency {
        /// Which collaborator failed.
        collaborator: String,
        /// The reported error.
        source: ProviderError,
    },

    /// A collaborator did not answer within the configured deadline.
    #[error("{collaborator} did not answer within {after:?}")]
    Timeout {
        /// Which collaborator timed out.
        collaborator: String,
        /// The deadline that elapsed.
        after: Duration,
    },

    /// A stage was invoked in a state the pipeline must never reach.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl Fault {
    /// Short, non-sensitive description suitable for a response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dependency { .. } => "dependency failure",
            Self::Timeout { .. } => "dependency timeout",
            Self::InvariantViolation(_) => "internal error",
        }
    }
}

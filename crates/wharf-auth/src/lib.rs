//! # Wharf Auth
//!
//! Transport-agnostic request-to-token pipeline.
//!
//! A host hands every inbound call to [`TokenPipeline::handle`] as a
//! [`RawRequest`] and writes back the returned [`ResponseIntent`]:
//!
//! 1. [`parse_request`] validates the query and [`extract_credentials`]
//!    collects caller credentials.
//! 2. The [`AuthenticationStrategy`] validates the caller.
//! 3. The ordered chain of [`AuthorizationProvider`]s decides which
//!    requested scopes are granted ([`Authorizer`]).
//! 4. [`TokenIssuer`] builds the token definition and the [`Signer`] signs it.
//!
//! Collaborators are injected through [`PipelineBuilder`]; nothing in this
//! crate knows how they obtain their data.

pub mod authn;
pub mod authz;
pub mod credentials;
pub mod error;
pub mod issuer;
pub mod parser;
pub mod pipeline;
pub mod provider;
pub mod raw;
pub mod response;

#[cfg(test)]
mod test_support;

pub use authn::Authenticator;
pub use authz::Authorizer;
pub use credentials::{extract_credentials, parse_basic_authorization};
pub use error::{ConfigError, Fault, ProviderError, Rejection};
pub use issuer::{IssuedToken, TokenIssuer, TokenOptions};
pub use parser::parse_request;
pub use pipeline::{PipelineBuilder, PipelineOptions, PipelineStage, PipelineState, TokenPipeline};
pub use provider::{AuthenticationStrategy, AuthorizationProvider, Signer};
pub use raw::RawRequest;
pub use response::{ResponseIntent, TokenResponse};

// Collaborator implementations need these to build their results.
pub use async_trait::async_trait;
pub use wharf_models as models;

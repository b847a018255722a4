//! Startup errors of the wharf server.
//!
//! Every misconfiguration is detected before the listener is bound; none of
//! these errors can happen while serving requests.

/// Errors raised while reading configuration and assembling the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// An environment variable held an unparsable value.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidVar {
        /// Variable name.
        var: String,
        /// The offending value.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A `WHARF_USERS` entry was not `user:password`.
    #[error("invalid user entry {0:?}: expected user:password")]
    InvalidUser(String),

    /// A `WHARF_ACL` rule could not be parsed.
    #[error("invalid ACL rule {rule:?}: {reason}")]
    InvalidAclRule {
        /// The offending rule.
        rule: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// The pipeline rejected its configuration.
    #[error(transparent)]
    Pipeline(#[from] wharf_auth::ConfigError),
}

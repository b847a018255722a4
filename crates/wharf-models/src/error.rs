//! Error types for the `wharf-models` crate.
//!
//! All fallible constructors and parsers in this crate return variants of
//! [`ValidationError`]. A validation error always describes a problem with
//! the caller's input and maps to a `400 Bad Request` at the transport layer.

/// Errors produced when parsing or validating an inbound token request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was absent or empty.
    #[error("missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A scope string did not have the `type:name:actions` shape.
    #[error("invalid scope \"{value}\": {reason}")]
    InvalidScope {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A boolean flag was neither `true` nor `false`.
    #[error("invalid value \"{value}\" for {field}: expected \"true\" or \"false\"")]
    InvalidFlag {
        /// The name of the flag.
        field: String,
        /// The value that failed validation.
        value: String,
    },

    /// The raw query string could not be decoded.
    #[error("invalid request query: {0}")]
    InvalidQuery(String),
}

impl ValidationError {
    /// The request field this error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field } | Self::InvalidFlag { field, .. } => Some(field),
            Self::InvalidScope { .. } => Some("scope"),
            Self::InvalidQuery(_) => None,
        }
    }
}

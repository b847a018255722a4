#![deny(missing_docs)]

//! # Wharf Models
//!
//! Core data types for the wharf token service.
//!
//! ## Request lifecycle
//!
//! ```text
//! TokenRequest
//! ├── AuthenticationResult      (who is calling)
//! ├── AuthorizationResult       (which scopes are granted / forbidden)
//! └── TokenDefinition           (what the signed token will assert)
//! ```
//!
//! All of these are created fresh for every request and dropped once the
//! response is written.
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`scope`] | `Scope`, `ScopeSet` and their set algebra |
//! | [`request`] | `TokenRequest`, credentials, ids |
//! | [`result`] | Authentication and authorization outcomes |
//! | [`token`] | `TokenDefinition` |
//! | [`error`] | `ValidationError` |

pub mod error;
pub mod request;
pub mod result;
pub mod scope;
pub mod token;

// Re-export all public types at crate root for convenience.
pub use error::*;
pub use request::*;
pub use result::*;
pub use scope::*;
pub use token::*;

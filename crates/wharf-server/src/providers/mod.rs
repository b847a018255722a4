//! Built-in collaborators for a self-contained deployment.
//!
//! | Module | Implements | Decides on |
//! |--------|------------|------------|
//! | [`users`] | `AuthenticationStrategy` | Basic credentials vs. a static user table |
//! | [`anonymous`] | `AuthenticationStrategy` | callers that present no credentials |
//! | [`chain`] | `AuthenticationStrategy` | first success among several strategies |
//! | [`acl`] | `AuthorizationProvider` | static `account=scope` rules |

pub mod acl;
pub mod anonymous;
pub mod chain;
pub mod users;

pub use acl::{AclRule, StaticAclAuthorization};
pub use anonymous::AnonymousAuthentication;
pub use chain::AuthenticationChain;
pub use users::StaticUserAuthentication;

//! Static access-control list.
//!
//! A rule has the form `account=type:name:actions`, e.g.
//! `alice=repository:alice/*:pull,push` or `*=repository:public/*:pull`.
//!
//! * `account` is an exact account name, or `*` for any caller (anonymous
//!   callers included).
//! * `name` matches exactly, or by prefix when it ends with `*`.
//! * `actions` lists what the rule allows; `*` allows every action.
//!
//! A requested scope is granted when one rule for the caller covers all of
//! its actions.

use std::str::FromStr;

use async_trait::async_trait;
use tracing::debug;
use wharf_auth::{AuthorizationProvider, ProviderError};
use wharf_models::{AuthenticationResult, AuthorizationResult, Scope, ScopeSet, TokenRequest};

use crate::error::StartupError;

/// Which callers a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountMatcher {
    /// Every caller.
    Any,
    /// One account.
    Exact(String),
}

impl AccountMatcher {
    fn matches(&self, account: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => account == Some(expected.as_str()),
        }
    }
}

/// One ACL rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclRule {
    account: AccountMatcher,
    scope: Scope,
}

impl AclRule {
    /// Whether this rule lets `account` perform every action of `scope`.
    pub fn covers(&self, account: Option<&str>, scope: &Scope) -> bool {
        self.account.matches(account)
            && self.scope.resource_type() == scope.resource_type()
            && name_matches(self.scope.resource_name(), scope.resource_name())
            && (self.scope.actions().any(|a| a == "*") || scope.actions_within(self.scope.actions()))
    }
}

fn name_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}

impl FromStr for AclRule {
    type Err = StartupError;

    fn from_str(rule: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| StartupError::InvalidAclRule {
            rule: rule.to_string(),
            reason,
        };

        let (account, scope) = rule
            .trim()
            .split_once('=')
            .ok_or_else(|| invalid("expected account=type:name:actions".into()))?;

        let account = match account.trim() {
            "" => return Err(invalid("account must not be empty".into())),
            "*" => AccountMatcher::Any,
            name => AccountMatcher::Exact(name.to_string()),
        };
        let scope = Scope::parse(scope.trim()).map_err(|e| invalid(e.to_string()))?;

        Ok(Self { account, scope })
    }
}

/// Grants still-forbidden scopes covered by a static rule set.
#[derive(Debug, Clone, Default)]
pub struct StaticAclAuthorization {
    rules: Vec<AclRule>,
}

impl StaticAclAuthorization {
    /// Build from parsed rules.
    pub fn new(rules: Vec<AclRule>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl AuthorizationProvider for StaticAclAuthorization {
    fn name(&self) -> &str {
        "static-acl"
    }

    async fn decide(
        &self,
        request: &TokenRequest,
        authn: &AuthenticationResult,
        current: &AuthorizationResult,
    ) -> Result<AuthorizationResult, ProviderError> {
        let account = authn.account.as_deref();
        let granted: ScopeSet = current
            .forbidden
            .iter()
            .filter(|scope| self.rules.iter().any(|rule| rule.covers(account, scope)))
            .cloned()
            .collect();

        debug!(
            account = ?account,
            granted = ?granted.to_strings(),
            "static ACL evaluated"
        );

        Ok(AuthorizationResult::grant(request.id.clone(), granted))
    }
}

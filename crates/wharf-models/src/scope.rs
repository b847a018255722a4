//! Resource scopes and their set algebra.
//!
//! A [`Scope`] names a resource (`type` + `name`) and the actions a client
//! wants to perform on it. Its wire form is `type:name:action[,action...]`,
//! e.g. `repository:library/alpine:pull,push`.
//!
//! A [`ScopeSet`] is a duplicate-free collection of scopes with union,
//! difference and intersection. Equality is order-independent, but the set
//! keeps insertion order so serialised output is deterministic.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// A single unit of requested or granted access.
///
/// Two scopes are equal when type, name and action set are equal; the order
/// in which actions were written does not matter.
///
/// The resource name may itself contain `:` (for instance a registry host
/// with a port, `repository:localhost:5000/app:pull`), so parsing splits on
/// the first and the last separator.
///
/// # Examples
///
/// ```
/// use wharf_models::Scope;
///
/// let scope: Scope = "repository:foo:push,pull".parse().unwrap();
/// assert_eq!(scope.resource_type(), "repository");
/// assert_eq!(scope.resource_name(), "foo");
/// assert_eq!(scope.to_string(), "repository:foo:pull,push");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Scope {
    resource_type: String,
    resource_name: String,
    actions: BTreeSet<String>,
}

impl Scope {
    /// Build a scope from its parts.
    ///
    /// Fails when the type or name is empty, contains a separator that would
    /// break the wire form, or when no action is given.
    pub fn new<I, S>(resource_type: &str, resource_name: &str, actions: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let actions: BTreeSet<String> = actions.into_iter().map(Into::into).collect();
        let wire = format!(
            "{resource_type}:{resource_name}:{}",
            actions.iter().cloned().collect::<Vec<_>>().join(",")
        );
        let invalid = |reason: &str| ValidationError::InvalidScope {
            value: wire.clone(),
            reason: reason.to_string(),
        };

        if resource_type.is_empty() || resource_type.contains(':') {
            return Err(invalid("resource type must be non-empty and must not contain ':'"));
        }
        if resource_name.is_empty() {
            return Err(invalid("resource name must not be empty"));
        }
        if actions.is_empty() {
            return Err(invalid("action list must not be empty"));
        }
        if actions.iter().any(|a| a.is_empty() || a.contains([',', ':'])) {
            return Err(invalid("actions must be non-empty and must not contain ',' or ':'"));
        }

        Ok(Self {
            resource_type: resource_type.to_string(),
            resource_name: resource_name.to_string(),
            actions,
        })
    }

    /// Parse the `type:name:action[,action...]` wire form.
    ///
    /// Empty segments in the action list (`pull,,push`) are ignored; a list
    /// with no action left is rejected.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidScope {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let (resource_type, rest) = value
            .split_once(':')
            .ok_or_else(|| invalid("expected type:name:actions"))?;
        let (resource_name, actions) = rest
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected type:name:actions"))?;

        if resource_type.is_empty() {
            return Err(invalid("resource type must not be empty"));
        }
        if resource_name.is_empty() {
            return Err(invalid("resource name must not be empty"));
        }

        let actions: BTreeSet<String> = actions
            .split(',')
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        if actions.is_empty() {
            return Err(invalid("action list must not be empty"));
        }

        Ok(Self {
            resource_type: resource_type.to_string(),
            resource_name: resource_name.to_string(),
            actions,
        })
    }

    /// Resource type, e.g. `repository`.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Resource name, e.g. `library/alpine`.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// Requested actions in lexical order.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }

    /// Whether every action of `self` is also present in `other_actions`.
    pub fn actions_within<'a, I>(&self, other_actions: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let allowed: BTreeSet<&str> = other_actions.into_iter().collect();
        self.actions.iter().all(|a| allowed.contains(a.as_str()))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:", self.resource_type, self.resource_name)?;
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(action)?;
        }
        Ok(())
    }
}

impl FromStr for Scope {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Scope {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.to_string()
    }
}

// ---------------------------------------------------------------------------
// ScopeSet
// ---------------------------------------------------------------------------

/// A duplicate-free, insertion-ordered set of [`Scope`]s.
///
/// Only structurally identical scopes are collapsed: `repository:foo:pull`
/// and `repository:foo:push` stay two distinct entries.
#[derive(Serialize, Deserialize, Debug, Clone, Default, Eq)]
#[serde(from = "Vec<Scope>", into = "Vec<Scope>")]
pub struct ScopeSet(Vec<Scope>);

impl ScopeSet {
    /// An empty set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a scope, returning `false` if it was already present.
    pub fn insert(&mut self, scope: Scope) -> bool {
        if self.contains(&scope) {
            return false;
        }
        self.0.push(scope);
        true
    }

    /// Whether the set holds a scope structurally equal to `scope`.
    pub fn contains(&self, scope: &Scope) -> bool {
        self.0.contains(scope)
    }

    /// Number of scopes in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Scope> {
        self.0.iter()
    }

    /// Scopes in `self` followed by those of `other` not already present.
    pub fn union(&self, other: &ScopeSet) -> ScopeSet {
        let mut out = self.clone();
        for scope in other {
            out.insert(scope.clone());
        }
        out
    }

    /// Scopes in `self` that are not in `other`.
    pub fn difference(&self, other: &ScopeSet) -> ScopeSet {
        self.0
            .iter()
            .filter(|s| !other.contains(s))
            .cloned()
            .collect()
    }

    /// Scopes present in both `self` and `other`, in `self`'s order.
    pub fn intersection(&self, other: &ScopeSet) -> ScopeSet {
        self.0
            .iter()
            .filter(|s| other.contains(s))
            .cloned()
            .collect()
    }

    /// Whether every scope of `self` is in `other`.
    pub fn is_subset(&self, other: &ScopeSet) -> bool {
        self.0.iter().all(|s| other.contains(s))
    }

    /// Whether `self` and `other` share no scope.
    pub fn is_disjoint(&self, other: &ScopeSet) -> bool {
        !self.0.iter().any(|s| other.contains(s))
    }

    /// Wire form of every scope, in insertion order.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(Scope::to_string).collect()
    }
}

impl PartialEq for ScopeSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<T: IntoIterator<Item = Scope>>(iter: T) -> Self {
        let mut set = ScopeSet::new();
        for scope in iter {
            set.insert(scope);
        }
        set
    }
}

impl From<Vec<Scope>> for ScopeSet {
    fn from(scopes: Vec<Scope>) -> Self {
        scopes.into_iter().collect()
    }
}

impl From<ScopeSet> for Vec<Scope> {
    fn from(set: ScopeSet) -> Self {
        set.0
    }
}

impl IntoIterator for ScopeSet {
    type Item = Scope;
    type IntoIter = std::vec::IntoIter<Scope>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ScopeSet {
    type Item = &'a Scope;
    type IntoIter = std::slice::Iter<'a, Scope>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

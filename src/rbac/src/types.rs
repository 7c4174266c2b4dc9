//! Core access control types

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Opaque user identifier
pub type UserId = String;

/// Role name
pub type Role = String;

/// Authorization scope name (tenant, resource class, ...)
pub type Context = String;

/// Set of roles
pub type RoleSet = BTreeSet<Role>;

/// Raw role-assignment row as returned by a role store
pub type RoleRow = serde_json::Map<String, serde_json::Value>;

/// Roles held by one identity, grouped by context
///
/// Every context present in the mapping holds at least one role. Contexts
/// are only created by inserting a role, so an empty set can never be
/// observed through [`RoleMapping::get`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleMapping {
    contexts: BTreeMap<Context, RoleSet>,
}

impl RoleMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mapping holding a single role in a single context
    pub fn single(context: impl Into<Context>, role: impl Into<Role>) -> Self {
        Self::new().with_role(context, role)
    }

    /// Add a role to a context, returning the updated mapping
    pub fn with_role(mut self, context: impl Into<Context>, role: impl Into<Role>) -> Self {
        self.insert(context, role);
        self
    }

    /// Add a role to a context
    ///
    /// Returns `true` if the role was not already present.
    pub fn insert(&mut self, context: impl Into<Context>, role: impl Into<Role>) -> bool {
        self.contexts
            .entry(context.into())
            .or_default()
            .insert(role.into())
    }

    /// Roles held in the given context
    pub fn get(&self, context: &str) -> Option<&RoleSet> {
        self.contexts.get(context)
    }

    /// Whether the role is held in the given context
    pub fn contains(&self, context: &str, role: &str) -> bool {
        self.get(context).is_some_and(|roles| roles.contains(role))
    }

    /// Iterate over `(context, roles)` pairs in context order
    pub fn iter(&self) -> impl Iterator<Item = (&Context, &RoleSet)> {
        self.contexts.iter()
    }

    /// Number of contexts holding roles
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl<C, R> FromIterator<(C, R)> for RoleMapping
where
    C: Into<Context>,
    R: Into<Role>,
{
    fn from_iter<I: IntoIterator<Item = (C, R)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (context, role) in iter {
            mapping.insert(context, role);
        }
        mapping
    }
}

//! Authorization rules and verdict types

use crate::types::{Role, RoleSet};
use serde::{Deserialize, Serialize};

/// Outcome of evaluating a rule against a role set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// A forbidden role is held
    Forbidden,
    /// An `any` or `all` rule is satisfied
    Granted,
    /// No rule applies; the configured default decides
    NotMatched,
}

impl Verdict {
    /// Collapse to a boolean, using `default` for [`Verdict::NotMatched`]
    pub fn resolve(self, default: bool) -> bool {
        match self {
            Verdict::Forbidden => false,
            Verdict::Granted => true,
            Verdict::NotMatched => default,
        }
    }
}

/// Per-route role requirements
///
/// Absent fields place no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationRule {
    /// Holding any of these roles denies access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forbidden: Option<RoleSet>,

    /// Holding any of these roles grants access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any: Option<RoleSet>,

    /// Holding all of these roles grants access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all: Option<RoleSet>,
}

impl AuthorizationRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forbidden<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.forbidden = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn any<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.any = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn all<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.all = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    /// Whether no constraint is configured
    pub fn is_unconstrained(&self) -> bool {
        self.forbidden.is_none() && self.any.is_none() && self.all.is_none()
    }
}

/// Why a verdict was reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionReason {
    /// Forbidden roles held by the caller
    ForbiddenRoles { roles: Vec<Role> },

    /// `any` rule matched on these roles
    AnyMatched { roles: Vec<Role> },

    /// `all` rule satisfied
    AllMatched,

    /// No rule matched; configured default applied
    DefaultDecision { default: bool },
}

/// Authorization decision for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,

    /// Final answer after applying the default
    pub authorized: bool,

    pub reason: DecisionReason,
}

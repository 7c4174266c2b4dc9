//! Role rule evaluation
//!
//! Evaluates forbidden / any / all role sets against the effective roles of
//! a request. Evaluation order, short-circuiting:
//!
//! ```text
//! forbidden ∩ roles ≠ ∅          → Forbidden
//! any ≠ ∅:  any ∩ roles ≠ ∅      → Granted
//!           all ⊆ roles          → Granted
//!           otherwise            → NotMatched
//! all present: all ⊆ roles       → Granted, else NotMatched
//! no rules                       → NotMatched
//! ```
//!
//! `NotMatched` is turned into a boolean with the configured default.

pub mod decision;

pub use decision::{AuthorizationRule, Decision, DecisionReason, Verdict};

use crate::types::RoleSet;
use tracing::debug;

/// Authorization engine with a configured default for unmatched requests
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationEngine {
    authorize_default: bool,
}

impl AuthorizationEngine {
    pub fn new(authorize_default: bool) -> Self {
        Self { authorize_default }
    }

    pub fn authorize_default(&self) -> bool {
        self.authorize_default
    }

    /// Compute the three-valued verdict
    ///
    /// Absent roles are evaluated as the empty set.
    pub fn authorize(roles: Option<&RoleSet>, rule: &AuthorizationRule) -> Verdict {
        evaluate(roles, rule).0
    }

    /// Compute the verdict and resolve it with the configured default
    pub fn decide(&self, roles: Option<&RoleSet>, rule: &AuthorizationRule) -> Decision {
        let (verdict, reason) = evaluate(roles, rule);
        let reason = reason.unwrap_or(DecisionReason::DefaultDecision {
            default: self.authorize_default,
        });
        let authorized = verdict.resolve(self.authorize_default);

        debug!(?verdict, authorized, "Authorization decision");

        Decision {
            verdict,
            authorized,
            reason,
        }
    }
}

fn evaluate(roles: Option<&RoleSet>, rule: &AuthorizationRule) -> (Verdict, Option<DecisionReason>) {
    let empty = RoleSet::new();
    let roles = roles.unwrap_or(&empty);

    if let Some(forbidden) = rule.forbidden.as_ref().filter(|f| !f.is_empty()) {
        let held: Vec<_> = forbidden.intersection(roles).cloned().collect();
        if !held.is_empty() {
            return (
                Verdict::Forbidden,
                Some(DecisionReason::ForbiddenRoles { roles: held }),
            );
        }
    }

    if let Some(any) = rule.any.as_ref().filter(|a| !a.is_empty()) {
        let matched: Vec<_> = any.intersection(roles).cloned().collect();
        if !matched.is_empty() {
            return (
                Verdict::Granted,
                Some(DecisionReason::AnyMatched { roles: matched }),
            );
        }
        return all_satisfied(rule.all.as_ref(), roles);
    }

    all_satisfied(rule.all.as_ref(), roles)
}

fn all_satisfied(all: Option<&RoleSet>, roles: &RoleSet) -> (Verdict, Option<DecisionReason>) {
    match all {
        Some(all) if all.is_subset(roles) => (Verdict::Granted, Some(DecisionReason::AllMatched)),
        _ => (Verdict::NotMatched, None),
    }
}

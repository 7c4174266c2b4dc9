//! Context filtering of resolved roles

use crate::types::{RoleMapping, RoleSet};

/// Roles applicable in `context`: the context's own roles plus global roles
///
/// Returns `None` only when neither side is present. With no requested
/// context only the global roles apply.
pub fn effective_roles(
    context: Option<&str>,
    mapping: Option<&RoleMapping>,
    global_context: &str,
) -> Option<RoleSet> {
    let mapping = mapping?;
    let in_context = context.and_then(|c| mapping.get(c));
    let global = mapping.get(global_context);

    match (in_context, global) {
        (None, None) => None,
        (Some(roles), None) | (None, Some(roles)) => Some(roles.clone()),
        (Some(a), Some(b)) => Some(a.union(b).cloned().collect()),
    }
}

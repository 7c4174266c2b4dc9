//! Property tests for context filtering, rule evaluation and role parsing

use cretoai_rbac::{
    effective_roles, parse_roles, AuthorizationEngine, AuthorizationRule, RoleMapping,
    RoleRecord, RoleSet, Verdict,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

const ROLES: &[&str] = &["admin", "editor", "reviewer", "viewer", "banned", "auditor"];
const CONTEXTS: &[&str] = &["!", "acme", "globex", "initech"];

fn role() -> impl Strategy<Value = String> {
    prop::sample::select(ROLES).prop_map(str::to_string)
}

fn context() -> impl Strategy<Value = String> {
    prop::sample::select(CONTEXTS).prop_map(str::to_string)
}

fn role_set() -> impl Strategy<Value = RoleSet> {
    prop::collection::btree_set(role(), 0..4)
}

fn role_mapping() -> impl Strategy<Value = RoleMapping> {
    prop::collection::vec((context(), role()), 0..12)
        .prop_map(|pairs| pairs.into_iter().collect())
}

proptest! {
    #[test]
    fn test_effective_roles_is_union_of_context_and_global(
        mapping in role_mapping(),
        requested in prop::option::of(context()),
    ) {
        let result = effective_roles(requested.as_deref(), Some(&mapping), "!");

        let mut expected = RoleSet::new();
        if let Some(roles) = requested.as_deref().and_then(|c| mapping.get(c)) {
            expected.extend(roles.iter().cloned());
        }
        if let Some(roles) = mapping.get("!") {
            expected.extend(roles.iter().cloned());
        }

        match result {
            Some(roles) => {
                prop_assert!(!roles.is_empty());
                prop_assert_eq!(roles, expected);
            }
            None => {
                prop_assert!(expected.is_empty());
            }
        }
    }

    #[test]
    fn test_effective_roles_absent_mapping(requested in prop::option::of(context())) {
        prop_assert_eq!(effective_roles(requested.as_deref(), None, "!"), None);
    }

    #[test]
    fn test_held_forbidden_role_always_wins(
        roles in role_set(),
        forbidden in role_set(),
        any_of in role_set(),
        all in role_set(),
        default in any::<bool>(),
    ) {
        let rule = AuthorizationRule::new()
            .forbidden(forbidden.clone())
            .any(any_of)
            .all(all);
        let decision = AuthorizationEngine::new(default).decide(Some(&roles), &rule);

        if forbidden.intersection(&roles).next().is_some() {
            prop_assert_eq!(decision.verdict, Verdict::Forbidden);
            prop_assert!(!decision.authorized);
        } else {
            prop_assert_ne!(decision.verdict, Verdict::Forbidden);
        }
    }

    #[test]
    fn test_superset_of_all_is_granted(
        all in role_set(),
        extra in role_set(),
        default in any::<bool>(),
    ) {
        let roles: RoleSet = all.union(&extra).cloned().collect();
        let rule = AuthorizationRule::new().all(all);

        let decision = AuthorizationEngine::new(default).decide(Some(&roles), &rule);
        prop_assert_eq!(decision.verdict, Verdict::Granted);
        prop_assert!(decision.authorized);
    }

    #[test]
    fn test_unmatched_follows_default(roles in role_set(), default in any::<bool>()) {
        let decision = AuthorizationEngine::new(default)
            .decide(Some(&roles), &AuthorizationRule::new());

        prop_assert_eq!(decision.verdict, Verdict::NotMatched);
        prop_assert_eq!(decision.authorized, default);
    }

    #[test]
    fn test_parsed_mapping_only_holds_known_roles(
        records in prop::collection::vec((role(), prop::option::of(context())), 0..12),
    ) {
        let known: BTreeMap<String, String> = ["admin", "editor", "viewer"]
            .iter()
            .map(|r| (r.to_string(), String::new()))
            .collect();

        let parsed = parse_roles(
            records.iter().map(|(role, context)| RoleRecord {
                role: Some(role.clone()),
                context: context.clone(),
            }),
            &known,
            "!",
            false,
        );

        let surviving = records.iter().filter(|(role, _)| known.contains_key(role)).count();
        match parsed {
            Some(mapping) => {
                prop_assert!(surviving > 0);
                for (_, roles) in mapping.iter() {
                    prop_assert!(!roles.is_empty());
                    prop_assert!(roles.iter().all(|r| known.contains_key(r)));
                }
            }
            None => {
                prop_assert_eq!(surviving, 0);
            }
        }
    }
}

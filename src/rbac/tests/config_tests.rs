//! Configuration file loading

use cretoai_rbac::{RbacConfig, RbacError, RoleSlot};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"{
            "known_roles": {
                "admin": "Administrator",
                "editor": "Document editor"
            },
            "global_context": "*",
            "context_path": "path.tenant",
            "anonymous_role": false,
            "self_role": "owner",
            "self_path": "params.user_id",
            "authorize_default": true,
            "unauthorized_redirect": "/login",
            "cache_ttl_secs": 30,
            "cache_capacity": 500
        }"#,
    );

    let config = assert_ok!(RbacConfig::from_file(file.path()));
    assert_eq!(config.anonymous_role, RoleSlot::disabled());

    let resolved = assert_ok!(config.resolve());
    assert_eq!(resolved.global_context, "*");
    assert_eq!(resolved.context_path.to_string(), "path.tenant");
    assert_eq!(resolved.builtin.anonymous, None);
    assert_eq!(resolved.builtin.self_owned.as_deref(), Some("owner"));
    assert_eq!(resolved.builtin.logged_in.as_deref(), Some("logged_in"));
    assert!(resolved.known_roles.contains_key("editor"));
    assert!(resolved.known_roles.contains_key("owner"));
    assert!(resolved.authorize_default);
    assert_eq!(resolved.unauthorized_redirect.as_deref(), Some("/login"));
    assert_eq!(resolved.cache.capacity, 500);
    assert_eq!(resolved.cache.ttl, Duration::from_secs(30));
}

#[test]
fn test_empty_document_uses_defaults() {
    let file = write_config("{}");

    let resolved = assert_ok!(assert_ok!(RbacConfig::from_file(file.path())).resolve());
    assert_eq!(resolved.global_context, "!");
    assert_eq!(resolved.context_column, "context");
    assert_eq!(resolved.session_key, "session");
    assert_eq!(resolved.context_path.to_string(), "params.context");
    assert!(!resolved.authorize_default);
    assert!(!resolved.keep_unknown);
    assert!(resolved.unauthorized_redirect.is_none());
    assert_eq!(resolved.cache.ttl, Duration::from_secs(60));
    assert_eq!(resolved.cache.capacity, 10_000);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = RbacConfig::from_file(dir.path().join("rbac.json"));

    assert!(matches!(result, Err(RbacError::Io(_))));
}

#[test]
fn test_malformed_file_is_serialization_error() {
    let file = write_config(r#"{ "known_roles": ["admin"] }"#);
    let result = RbacConfig::from_file(file.path());

    assert!(matches!(result, Err(RbacError::Serialization(_))));
}

#[test]
fn test_invalid_values_rejected_on_resolve() {
    let file = write_config(r#"{ "cache_capacity": 0 }"#);
    let config = assert_ok!(RbacConfig::from_file(file.path()));
    assert_err!(config.resolve());

    let file = write_config(r#"{ "unauthorized_redirect": "  " }"#);
    let config = assert_ok!(RbacConfig::from_file(file.path()));
    assert_err!(config.resolve());
}

//! Access control configuration
//!
//! [`RbacConfig`] is the user-facing, deserializable form. It is turned into a
//! [`ResolvedConfig`] once at startup by [`RbacConfig::resolve`], which
//! validates paths and registers the built-in roles. Configuration problems
//! are reported there and never surface per request.

use crate::cache::CacheConfig;
use crate::error::{RbacError, Result};
use crate::types::{Context, Role};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Default global context sentinel
pub const DEFAULT_GLOBAL_CONTEXT: &str = "!";

/// Default name of the role-store column holding the context
pub const DEFAULT_CONTEXT_COLUMN: &str = "context";

/// Default location of the requested context inside request data
pub const DEFAULT_CONTEXT_PATH: &str = "params.context";

/// Default session cookie / lookup key
pub const DEFAULT_SESSION_KEY: &str = "session";

/// Configuration of one built-in role slot
///
/// Deserializes from `true` (default name), `false` (disabled) or a string
/// (custom role name).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RoleSlot {
    Enabled(bool),
    Named(Role),
}

impl Default for RoleSlot {
    fn default() -> Self {
        RoleSlot::Enabled(true)
    }
}

impl RoleSlot {
    pub fn disabled() -> Self {
        RoleSlot::Enabled(false)
    }

    pub fn named(role: impl Into<Role>) -> Self {
        RoleSlot::Named(role.into())
    }
}

/// Built-in roles assigned by the request processor rather than a role store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinRole {
    /// Caller without an identity
    Anonymous,
    /// Any authenticated caller
    LoggedIn,
    /// Identity known from the session, but the session is not valid
    KnownUser,
    /// Caller owns the requested resource
    SelfOwned,
}

impl BuiltinRole {
    pub const ALL: [BuiltinRole; 4] = [
        BuiltinRole::Anonymous,
        BuiltinRole::LoggedIn,
        BuiltinRole::KnownUser,
        BuiltinRole::SelfOwned,
    ];

    pub fn default_name(&self) -> &'static str {
        match self {
            BuiltinRole::Anonymous => "anonymous",
            BuiltinRole::LoggedIn => "logged_in",
            BuiltinRole::KnownUser => "known_user",
            BuiltinRole::SelfOwned => "self",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BuiltinRole::Anonymous => "Anonymous user",
            BuiltinRole::LoggedIn => "Logged-in user",
            BuiltinRole::KnownUser => "Known user with an expired or invalid session",
            BuiltinRole::SelfOwned => "Owner of the accessed resource",
        }
    }
}

/// Dotted path into a JSON document, e.g. `params.context` or `items.0.id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPath(Vec<String>);

impl DataPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Read the value at this path; JSON `null` counts as absent
    pub fn lookup<'a>(&self, data: &'a Value) -> Option<&'a Value> {
        let mut current = data;
        for segment in &self.0 {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        (!current.is_null()).then_some(current)
    }
}

impl FromStr for DataPath {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<String> = s.split('.').map(|seg| seg.trim().to_string()).collect();

        if s.trim().is_empty() || segments.iter().any(|seg| seg.is_empty()) {
            return Err(RbacError::Configuration(format!("Malformed data path: '{}'", s)));
        }

        Ok(Self(segments))
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Access control configuration as written by the operator
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    /// Known roles and their human-readable descriptions
    pub known_roles: BTreeMap<Role, String>,

    /// Context whose roles apply everywhere
    pub global_context: Context,

    /// Role-store column holding the context of an assignment
    pub context_column: String,

    /// Where the requested context is read from request data
    pub context_path: String,

    /// Session lookup key
    pub session_key: String,

    pub anonymous_role: RoleSlot,
    pub logged_in_role: RoleSlot,
    pub known_user_role: RoleSlot,
    pub self_role: RoleSlot,

    /// Request data path holding the owner of the accessed resource
    pub self_path: Option<String>,

    /// Request data path the owner must be equal to, usually
    /// `session.user_id` (the caller's session is visible under `session`)
    pub self_check_path: Option<String>,

    /// Verdict used when no rule matches
    pub authorize_default: bool,

    /// Keep roles missing from `known_roles` when parsing store records
    pub keep_unknown: bool,

    /// Redirect target for requests that are not granted
    pub unauthorized_redirect: Option<String>,

    /// Role cache time-to-live in seconds
    pub cache_ttl_secs: u64,

    /// Maximum number of identities kept in the role cache
    pub cache_capacity: usize,
}

impl Default for RbacConfig {
    fn default() -> Self {
        let cache = CacheConfig::default();

        Self {
            known_roles: BTreeMap::new(),
            global_context: DEFAULT_GLOBAL_CONTEXT.to_string(),
            context_column: DEFAULT_CONTEXT_COLUMN.to_string(),
            context_path: DEFAULT_CONTEXT_PATH.to_string(),
            session_key: DEFAULT_SESSION_KEY.to_string(),
            anonymous_role: RoleSlot::default(),
            logged_in_role: RoleSlot::default(),
            known_user_role: RoleSlot::default(),
            self_role: RoleSlot::default(),
            self_path: None,
            self_check_path: None,
            authorize_default: false,
            keep_unknown: false,
            unauthorized_redirect: None,
            cache_ttl_secs: cache.ttl.as_secs(),
            cache_capacity: cache.capacity,
        }
    }
}

impl RbacConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        debug!("Loaded access control configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `RBAC_*` environment variable overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(size) = var("RBAC_CACHE_SIZE") {
            self.cache_capacity = parse_var("RBAC_CACHE_SIZE", &size)?;
        }
        if let Some(ttl) = var("RBAC_CACHE_TTL") {
            self.cache_ttl_secs = parse_var("RBAC_CACHE_TTL", &ttl)?;
        }
        if let Some(default) = var("RBAC_AUTHORIZE_DEFAULT") {
            self.authorize_default = parse_var("RBAC_AUTHORIZE_DEFAULT", &default)?;
        }
        if let Some(global) = var("RBAC_GLOBAL_CONTEXT") {
            self.global_context = global;
        }
        if let Some(target) = var("RBAC_UNAUTHORIZED_REDIRECT") {
            self.unauthorized_redirect = Some(target);
        }
        Ok(self)
    }

    /// Validate the configuration and register built-in roles
    pub fn resolve(self) -> Result<ResolvedConfig> {
        require_non_empty("global_context", &self.global_context)?;
        require_non_empty("context_column", &self.context_column)?;
        require_non_empty("session_key", &self.session_key)?;

        if self.cache_capacity == 0 {
            return Err(RbacError::Configuration(
                "cache_capacity must be greater than zero".to_string(),
            ));
        }
        if let Some(target) = &self.unauthorized_redirect {
            require_non_empty("unauthorized_redirect", target)?;
        }

        let context_path = self.context_path.parse()?;
        let self_path = self.self_path.as_deref().map(str::parse).transpose()?;
        let self_check_path = self.self_check_path.as_deref().map(str::parse).transpose()?;

        if self_check_path.is_some() && self_path.is_none() {
            return Err(RbacError::Configuration(
                "self_check_path requires self_path".to_string(),
            ));
        }

        let mut known_roles = self.known_roles;
        let builtin = BuiltinRoles {
            anonymous: register_builtin(&mut known_roles, BuiltinRole::Anonymous, &self.anonymous_role)?,
            logged_in: register_builtin(&mut known_roles, BuiltinRole::LoggedIn, &self.logged_in_role)?,
            known_user: register_builtin(&mut known_roles, BuiltinRole::KnownUser, &self.known_user_role)?,
            self_owned: register_builtin(&mut known_roles, BuiltinRole::SelfOwned, &self.self_role)?,
        };

        debug!(
            known_roles = known_roles.len(),
            global_context = %self.global_context,
            "Resolved access control configuration"
        );

        Ok(ResolvedConfig {
            known_roles,
            global_context: self.global_context,
            context_column: self.context_column,
            context_path,
            session_key: self.session_key,
            builtin,
            self_path,
            self_check_path,
            authorize_default: self.authorize_default,
            keep_unknown: self.keep_unknown,
            unauthorized_redirect: self.unauthorized_redirect,
            cache: CacheConfig {
                capacity: self.cache_capacity,
                ttl: Duration::from_secs(self.cache_ttl_secs),
            },
        })
    }
}

/// Names of the enabled built-in roles; `None` disables the mechanism
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltinRoles {
    pub anonymous: Option<Role>,
    pub logged_in: Option<Role>,
    pub known_user: Option<Role>,
    pub self_owned: Option<Role>,
}

impl BuiltinRoles {
    pub fn get(&self, role: BuiltinRole) -> Option<&Role> {
        match role {
            BuiltinRole::Anonymous => self.anonymous.as_ref(),
            BuiltinRole::LoggedIn => self.logged_in.as_ref(),
            BuiltinRole::KnownUser => self.known_user.as_ref(),
            BuiltinRole::SelfOwned => self.self_owned.as_ref(),
        }
    }
}

/// Validated configuration consumed by the request processor
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub known_roles: BTreeMap<Role, String>,
    pub global_context: Context,
    pub context_column: String,
    pub context_path: DataPath,
    pub session_key: String,
    pub builtin: BuiltinRoles,
    pub self_path: Option<DataPath>,
    pub self_check_path: Option<DataPath>,
    pub authorize_default: bool,
    pub keep_unknown: bool,
    pub unauthorized_redirect: Option<String>,
    pub cache: CacheConfig,
}

fn register_builtin(
    known_roles: &mut BTreeMap<Role, String>,
    builtin: BuiltinRole,
    slot: &RoleSlot,
) -> Result<Option<Role>> {
    match slot {
        RoleSlot::Enabled(false) => {
            known_roles.remove(builtin.default_name());
            Ok(None)
        }
        RoleSlot::Enabled(true) => {
            let name = builtin.default_name().to_string();
            known_roles
                .entry(name.clone())
                .or_insert_with(|| builtin.description().to_string());
            Ok(Some(name))
        }
        RoleSlot::Named(name) => {
            let name = name.trim();
            if name.is_empty() {
                return Err(RbacError::Configuration(format!(
                    "Built-in role '{}' has an empty name",
                    builtin.default_name()
                )));
            }
            known_roles
                .entry(name.to_string())
                .or_insert_with(|| builtin.description().to_string());
            Ok(Some(name.to_string()))
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RbacError::Configuration(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RbacError::Configuration(format!("Invalid value for {}: '{}'", key, value)))
}

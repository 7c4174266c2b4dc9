//! Per-route access rules and request data
//!
//! The router attaches a [`RouteRules`] extension to each matched route,
//! e.g. an axum `Extension(rules)` layer wrapped around the
//! [`RbacLayer`](crate::middleware::RbacLayer). Parameter middleware
//! attaches the request's parsed parameters as [`RequestData`]; context
//! resolution and the self-ownership check read from it. The self check
//! also sees the caller's session under `session`, so `session.user_id` is
//! the usual owner check path.

use crate::config::DataPath;
use crate::engine::AuthorizationRule;
use crate::error::Result;
use crate::parser::normalize_name;
use crate::session::Session;
use crate::types::Context;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

/// Parsed parameters of a request (path, query, body) as one JSON document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestData(pub Value);

impl RequestData {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Value at `path`; JSON `null` counts as absent
    pub fn get(&self, path: &DataPath) -> Option<&Value> {
        path.lookup(&self.0)
    }

    /// Copy of the data with the caller's session under [`SESSION_DATA_KEY`]
    ///
    /// Exposes `session.id`, `session.user_id` and `session.valid` to data
    /// paths. Replaces any client-supplied value at that key. Non-object data
    /// is replaced by an object holding only the session.
    pub fn with_session(&self, session: &Session) -> RequestData {
        let mut map = match &self.0 {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        map.insert(
            SESSION_DATA_KEY.to_string(),
            json!({
                "id": session.id,
                "user_id": session.user_id(),
                "valid": session.valid,
            }),
        );
        RequestData(Value::Object(map))
    }
}

/// Top-level key under which the session is visible to the self check
pub const SESSION_DATA_KEY: &str = "session";

type ContextFn = dyn Fn(&RequestData) -> Option<Context> + Send + Sync;

/// Determines the requested context of a request
#[derive(Clone)]
pub enum ContextResolver {
    /// Read the context from a fixed location in request data
    Path(DataPath),
    /// Compute the context with a function
    Function(Arc<ContextFn>),
}

impl ContextResolver {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&RequestData) -> Option<Context> + Send + Sync + 'static,
    {
        ContextResolver::Function(Arc::new(f))
    }

    pub fn resolve(&self, data: &RequestData) -> Option<Context> {
        match self {
            ContextResolver::Path(path) => data.get(path).and_then(normalize_name),
            ContextResolver::Function(f) => f(data),
        }
    }
}

impl fmt::Debug for ContextResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextResolver::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ContextResolver::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Access rules of one route
#[derive(Debug, Clone, Default)]
pub struct RouteRules {
    pub rule: AuthorizationRule,

    /// Overrides the configured context resolution for this route
    pub context: Option<ContextResolver>,
}

impl RouteRules {
    pub fn new(rule: AuthorizationRule) -> Self {
        Self {
            rule,
            context: None,
        }
    }

    /// Read this route's context from a dotted request data path
    pub fn with_context_path(mut self, path: &str) -> Result<Self> {
        self.context = Some(ContextResolver::Path(path.parse()?));
        Ok(self)
    }

    pub fn with_context_resolver(mut self, resolver: ContextResolver) -> Self {
        self.context = Some(resolver);
        self
    }
}

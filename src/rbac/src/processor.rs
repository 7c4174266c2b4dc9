//! Request processing: identity → roles → context → verdict
//!
//! # Pipeline
//!
//! ```text
//! Session → identity → RoleCache (→ RoleSource + RoleParser)
//!                        ↓
//!         built-in roles (anonymous / known user / logged in / self)
//!                        ↓
//!         request context → effective roles → AuthorizationEngine
//!                        ↓
//!         AccessFacts extension  or  redirect
//! ```
//!
//! Everything after session lookup is computed lazily through
//! [`AccessFacts`] and memoized for the lifetime of the request. The verdict
//! is forced eagerly only when an unauthorized redirect is configured.

use crate::cache::{CachedRoles, RoleCache};
use crate::config::{DataPath, ResolvedConfig};
use crate::engine::{AuthorizationEngine, Decision};
use crate::error::{RbacError, Result};
use crate::filter::effective_roles;
use crate::parser::RoleParser;
use crate::route::{ContextResolver, RequestData, RouteRules};
use crate::session::{Session, SessionResolver};
use crate::source::{RoleLoader, RoleSource};
use crate::types::{Context, RoleMapping, RoleSet};
use axum::http::Request;
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Result of processing a request
#[derive(Debug)]
pub enum Outcome<B> {
    /// Forward the request, augmented with [`AccessFacts`]
    Forward(Request<B>),
    /// Respond with a redirect instead of forwarding
    Deny(Response),
}

struct ProcessorInner {
    config: Arc<ResolvedConfig>,
    cache: Arc<RoleCache>,
    loader: RoleLoader,
    sessions: Arc<dyn SessionResolver>,
    engine: AuthorizationEngine,
    context_resolver: ContextResolver,
}

/// Access control request processor
///
/// Cheap to clone; clones share the role cache.
#[derive(Clone)]
pub struct RequestProcessor {
    inner: Arc<ProcessorInner>,
}

impl RequestProcessor {
    /// Create a processor with its own role cache
    pub fn new(
        config: ResolvedConfig,
        source: Arc<dyn RoleSource>,
        sessions: Arc<dyn SessionResolver>,
    ) -> Self {
        let cache = Arc::new(RoleCache::new(config.cache.clone()));
        Self::with_cache(config, source, sessions, cache)
    }

    /// Create a processor around an existing role cache
    pub fn with_cache(
        config: ResolvedConfig,
        source: Arc<dyn RoleSource>,
        sessions: Arc<dyn SessionResolver>,
        cache: Arc<RoleCache>,
    ) -> Self {
        let loader = RoleLoader::new(source, RoleParser::from_config(&config));
        let engine = AuthorizationEngine::new(config.authorize_default);
        let context_resolver = ContextResolver::Path(config.context_path.clone());

        info!(
            authorize_default = config.authorize_default,
            redirect = config.unauthorized_redirect.is_some(),
            cache_capacity = config.cache.capacity,
            "Request processor initialized"
        );

        Self {
            inner: Arc::new(ProcessorInner {
                config: Arc::new(config),
                cache,
                loader,
                sessions,
                engine,
                context_resolver,
            }),
        }
    }

    /// Replace the default context resolution for all routes
    pub fn with_context_resolver(self, resolver: ContextResolver) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(ProcessorInner {
                config: inner.config.clone(),
                cache: inner.cache.clone(),
                loader: inner.loader.clone(),
                sessions: inner.sessions.clone(),
                engine: inner.engine,
                context_resolver: resolver,
            }),
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &Arc<RoleCache> {
        &self.inner.cache
    }

    /// Force re-resolution of a user's roles on next access
    pub async fn invalidate_cache(&self, user_id: &str) -> bool {
        self.inner.cache.invalidate(user_id).await
    }

    /// Release cached roles
    pub async fn shutdown(&self) {
        self.inner.cache.clear().await;
    }

    /// Attach [`AccessFacts`] to the request, or deny it with a redirect
    ///
    /// Fails when the session or role lookup fails; access is never granted
    /// on a failed lookup.
    pub async fn process<B>(&self, request: Request<B>) -> Result<Outcome<B>> {
        let (mut parts, body) = request.into_parts();

        let session = self
            .inner
            .sessions
            .session_of(&parts, &self.inner.config.session_key)
            .await?;
        let data = parts.extensions.get::<RequestData>().cloned().unwrap_or_default();
        let rules = parts.extensions.get::<RouteRules>().cloned().unwrap_or_default();

        let facts = AccessFacts::new(self.inner.clone(), session, data, rules);

        debug!(
            method = %parts.method,
            path = %parts.uri.path(),
            user_id = facts.user_id().unwrap_or("-"),
            authenticated = facts.authenticated(),
            "Processing request"
        );

        if let Some(target) = &self.inner.config.unauthorized_redirect {
            let decision = facts.decision().await?;
            if !decision.authorized {
                info!(
                    path = %parts.uri.path(),
                    user_id = facts.user_id().unwrap_or("-"),
                    verdict = ?decision.verdict,
                    "Access denied, redirecting to {}",
                    target
                );
                return Ok(Outcome::Deny(Redirect::to(target).into_response()));
            }
        }

        parts.extensions.insert(facts);
        Ok(Outcome::Forward(Request::from_parts(parts, body)))
    }
}

impl ProcessorInner {
    async fn resolve_roles(&self, session: Option<&Session>, data: &RequestData) -> Result<CachedRoles> {
        let config = &self.config;
        let global = &config.global_context;
        let builtin_only = |role: &Option<String>| {
            role.as_ref()
                .map(|role| Arc::new(RoleMapping::single(global.clone(), role.clone())))
        };

        let Some(user_id) = session.and_then(Session::user_id) else {
            return Ok(builtin_only(&config.builtin.anonymous));
        };

        if !session.is_some_and(Session::is_authenticated) {
            debug!(user_id = %user_id, "Session not valid, using known-user role");
            return Ok(builtin_only(&config.builtin.known_user));
        }

        let loader = &self.loader;
        let cached = self.cache.resolve(user_id, || loader.load(user_id)).await?;

        let mut extra = Vec::new();
        if let (Some(role), Some(session)) = (&config.builtin.self_owned, session) {
            let view = data.with_session(session);
            if is_self(&view, config.self_path.as_ref(), config.self_check_path.as_ref()) {
                extra.push(role);
            }
        }
        if let Some(role) = &config.builtin.logged_in {
            extra.push(role);
        }

        if extra.is_empty() {
            return Ok(cached);
        }

        // built-in roles are folded in per request and never cached
        let mut mapping = cached.as_deref().cloned().unwrap_or_default();
        for role in extra {
            mapping.insert(global.clone(), role.clone());
        }
        Ok(Some(Arc::new(mapping)))
    }
}

/// Whether the request accesses a resource owned by the caller
///
/// With a check path, the values at both paths must be present and equal.
/// Without one, any value at `self_path` is enough. The processor passes
/// [`RequestData::with_session`] data, so a check path of `session.user_id`
/// compares against the authenticated identity.
pub fn is_self(data: &RequestData, self_path: Option<&DataPath>, self_check_path: Option<&DataPath>) -> bool {
    let Some(value) = self_path.and_then(|path| data.get(path)) else {
        return false;
    };

    match self_check_path {
        Some(check) => data
            .get(check)
            .is_some_and(|expected| values_match(value, expected)),
        None => true,
    }
}

fn values_match(a: &Value, b: &Value) -> bool {
    fn scalar_text(v: &Value) -> Option<String> {
        match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    a == b || matches!((scalar_text(a), scalar_text(b)), (Some(x), Some(y)) if x == y)
}

struct FactsInner {
    processor: Arc<ProcessorInner>,
    session: Option<Session>,
    data: RequestData,
    rules: RouteRules,
    roles: OnceCell<CachedRoles>,
    context: OnceLock<Option<Context>>,
    in_context_roles: OnceCell<Option<RoleSet>>,
    decision: OnceCell<Decision>,
}

/// Access control facts of one request
///
/// Inserted into request extensions by [`RequestProcessor::process`]. Each
/// fact is computed on first use and memoized, so repeated reads within the
/// request never hit the role cache again.
#[derive(Clone)]
pub struct AccessFacts {
    inner: Arc<FactsInner>,
}

impl AccessFacts {
    fn new(
        processor: Arc<ProcessorInner>,
        session: Option<Session>,
        data: RequestData,
        rules: RouteRules,
    ) -> Self {
        Self {
            inner: Arc::new(FactsInner {
                processor,
                session,
                data,
                rules,
                roles: OnceCell::new(),
                context: OnceLock::new(),
                in_context_roles: OnceCell::new(),
                decision: OnceCell::new(),
            }),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.inner.session.as_ref()
    }

    /// Identity of the caller, whether or not the session is valid
    pub fn user_id(&self) -> Option<&str> {
        self.session().and_then(Session::user_id)
    }

    pub fn authenticated(&self) -> bool {
        self.session().is_some_and(Session::is_authenticated)
    }

    /// All roles of the caller, by context
    pub async fn roles(&self) -> Result<CachedRoles> {
        let inner = &self.inner;
        inner
            .roles
            .get_or_try_init(|| inner.processor.resolve_roles(inner.session.as_ref(), &inner.data))
            .await
            .cloned()
    }

    /// Requested context
    pub fn context(&self) -> Option<&str> {
        let inner = &self.inner;
        inner
            .context
            .get_or_init(|| {
                let resolver = inner
                    .rules
                    .context
                    .as_ref()
                    .unwrap_or(&inner.processor.context_resolver);
                resolver.resolve(&inner.data)
            })
            .as_deref()
    }

    /// Roles applicable in the requested context
    pub async fn in_context_roles(&self) -> Result<Option<&RoleSet>> {
        let inner = &self.inner;
        let roles = inner
            .in_context_roles
            .get_or_try_init(|| async {
                let roles = self.roles().await?;
                Ok::<_, RbacError>(effective_roles(
                    self.context(),
                    roles.as_deref(),
                    &inner.processor.config.global_context,
                ))
            })
            .await?;
        Ok(roles.as_ref())
    }

    /// Authorization decision for the matched route
    pub async fn decision(&self) -> Result<&Decision> {
        let inner = &self.inner;
        inner
            .decision
            .get_or_try_init(|| async {
                let roles = self.in_context_roles().await?;
                Ok::<_, RbacError>(inner.processor.engine.decide(roles, &inner.rules.rule))
            })
            .await
    }

    pub async fn authorized(&self) -> Result<bool> {
        Ok(self.decision().await?.authorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> DataPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_is_self_without_check_path() {
        let data = RequestData::new(json!({ "params": { "user_id": "alice" } }));

        assert!(is_self(&data, Some(&path("params.user_id")), None));
        assert!(!is_self(&data, Some(&path("params.owner")), None));
        assert!(!is_self(&data, None, None));
    }

    #[test]
    fn test_is_self_against_session_identity() {
        let data = RequestData::new(json!({
            "params": { "user_id": "alice" },
            "session": { "user_id": "alice" }
        }));
        let owner = path("params.user_id");
        let check = path("session.user_id");

        let alice = data.with_session(&Session::authenticated("s-alice", "alice"));
        assert!(is_self(&alice, Some(&owner), Some(&check)));

        let bob = data.with_session(&Session::authenticated("s-bob", "bob"));
        assert!(!is_self(&bob, Some(&owner), Some(&check)));
    }

    #[test]
    fn test_is_self_with_check_path() {
        let data = RequestData::new(json!({
            "params": { "user_id": "42" },
            "session": { "user_id": 42, "other": "7" }
        }));

        assert!(is_self(&data, Some(&path("params.user_id")), Some(&path("session.user_id"))));
        assert!(!is_self(&data, Some(&path("params.user_id")), Some(&path("session.other"))));
        assert!(!is_self(&data, Some(&path("params.user_id")), Some(&path("session.missing"))));
    }
}

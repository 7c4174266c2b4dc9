//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::Request;
use cretoai_rbac::{
    ExtensionSessionResolver, InMemoryRoleSource, RbacConfig, RbacError, RequestData,
    RequestProcessor, Result, RoleRow, RoleSource, RouteRules, Session,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Role source that counts queries and can be slowed down or broken
#[derive(Default)]
pub struct CountingSource {
    pub roles: InMemoryRoleSource,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay_ms: AtomicU64,
}

impl CountingSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoleSource for CountingSource {
    async fn query_roles(&self, user_id: &str) -> Result<Vec<RoleRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(RbacError::RoleQuery("role store unavailable".to_string()));
        }
        self.roles.query_roles(user_id).await
    }
}

/// Configuration with a handful of known application roles
pub fn base_config() -> RbacConfig {
    let mut config = RbacConfig::default();
    for role in ["admin", "editor", "reviewer", "viewer", "banned"] {
        config
            .known_roles
            .insert(role.to_string(), format!("{} role", role));
    }
    config.self_path = Some("params.user_id".to_string());
    config.self_check_path = Some("session.user_id".to_string());
    config
}

/// Processor reading sessions from request extensions
pub fn processor(config: RbacConfig, source: Arc<CountingSource>) -> RequestProcessor {
    init_tracing();
    let resolved = config.resolve().expect("valid configuration");
    RequestProcessor::new(resolved, source, Arc::new(ExtensionSessionResolver))
}

/// Request carrying a session, request data and route rules as extensions
pub fn request(session: Option<Session>, data: Value, rules: Option<RouteRules>) -> Request<()> {
    let mut request = Request::builder()
        .uri("/resource")
        .body(())
        .expect("valid request");

    let extensions = request.extensions_mut();
    if let Some(session) = session {
        extensions.insert(session);
    }
    extensions.insert(RequestData::new(data));
    if let Some(rules) = rules {
        extensions.insert(rules);
    }
    request
}

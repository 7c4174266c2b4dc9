//! # CretoAI Role-Based Access Control
//!
//! Role resolution and per-route authorization for HTTP requests.
//!
//! ## Features
//!
//! - **Layered role resolution**: anonymous, known-but-invalid session,
//!   authenticated and self-owned resource roles
//! - **Context-scoped roles**: roles granted per tenant or resource class,
//!   plus global roles that apply everywhere
//! - **Read-through role cache** with LRU eviction, TTL expiry and explicit
//!   per-user invalidation
//! - **Three-valued verdicts**: forbidden / granted / not matched, with a
//!   configurable default
//! - **Lazy request facts**: roles, context and verdict are computed only
//!   when a handler asks for them
//!
//! ## Example
//!
//! ```rust
//! use cretoai_rbac::{
//!     AuthorizationRule, InMemoryRoleSource, InMemorySessionStore, Outcome, RbacConfig,
//!     RequestProcessor, RouteRules,
//! };
//! use axum::http::{header, Request};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = RbacConfig::default();
//!     config.known_roles.insert("editor".into(), "Document editor".into());
//!
//!     let source = Arc::new(InMemoryRoleSource::new());
//!     source.grant("alice", "editor", "acme").await;
//!
//!     let sessions = Arc::new(InMemorySessionStore::new());
//!     let session = sessions.create("alice");
//!
//!     let processor = RequestProcessor::new(config.resolve()?, source, sessions);
//!
//!     let mut request = Request::builder()
//!         .uri("/docs/1")
//!         .header(header::COOKIE, format!("session={}", session.id.unwrap()))
//!         .body(())?;
//!     request
//!         .extensions_mut()
//!         .insert(RouteRules::new(AuthorizationRule::new().any(["editor"])));
//!
//!     if let Outcome::Forward(request) = processor.process(request).await? {
//!         let facts = request.extensions().get::<cretoai_rbac::AccessFacts>().unwrap();
//!         println!("authorized: {}", facts.authorized().await?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod middleware;
pub mod parser;
pub mod processor;
pub mod route;
pub mod session;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use cache::{CacheConfig, CacheStats, CachedRoles, RoleCache};
pub use config::{BuiltinRole, BuiltinRoles, DataPath, RbacConfig, ResolvedConfig, RoleSlot};
pub use engine::{AuthorizationEngine, AuthorizationRule, Decision, DecisionReason, Verdict};
pub use error::{RbacError, Result};
pub use filter::effective_roles;
pub use middleware::{require_authorized, RbacLayer, RbacService};
pub use parser::{parse_roles, RoleParser, RoleRecord};
pub use processor::{is_self, AccessFacts, Outcome, RequestProcessor};
pub use route::{ContextResolver, RequestData, RouteRules};
pub use session::{ExtensionSessionResolver, InMemorySessionStore, Session, SessionResolver};
pub use source::{InMemoryRoleSource, RoleLoader, RoleSource};
pub use types::{Context, Role, RoleMapping, RoleRow, RoleSet, UserId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Role sources and the loader feeding the role cache

use crate::error::Result;
use crate::parser::RoleParser;
use crate::types::{Context, Role, RoleMapping, RoleRow, UserId};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Store of role assignments
///
/// Implementations return raw rows holding a `role` field and a context
/// field (named by the configured context column). Failures are reported as
/// [`RbacError::RoleQuery`](crate::error::RbacError::RoleQuery) and are not
/// retried.
#[async_trait]
pub trait RoleSource: Send + Sync {
    /// Role assignment rows of a user
    async fn query_roles(&self, user_id: &str) -> Result<Vec<RoleRow>>;
}

/// In-memory role source
pub struct InMemoryRoleSource {
    rows: Arc<RwLock<HashMap<UserId, Vec<RoleRow>>>>,
    context_column: String,
}

impl InMemoryRoleSource {
    /// Create a new in-memory role source using the `context` column
    pub fn new() -> Self {
        Self::with_context_column(crate::config::DEFAULT_CONTEXT_COLUMN)
    }

    pub fn with_context_column(column: impl Into<String>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            context_column: column.into(),
        }
    }

    /// Assign a role to a user in a context
    pub async fn grant(&self, user_id: impl Into<UserId>, role: impl Into<Role>, context: impl Into<Context>) {
        let mut row = RoleRow::new();
        row.insert("role".to_string(), Value::String(role.into()));
        row.insert(self.context_column.clone(), Value::String(context.into()));
        self.insert_row(user_id, row).await;
    }

    /// Store a raw row for a user
    pub async fn insert_row(&self, user_id: impl Into<UserId>, row: RoleRow) {
        let mut rows = self.rows.write().await;
        rows.entry(user_id.into()).or_default().push(row);
    }

    /// Remove a role assignment; returns `true` if one was removed
    pub async fn revoke(&self, user_id: &str, role: &str, context: &str) -> bool {
        let mut rows = self.rows.write().await;
        let Some(user_rows) = rows.get_mut(user_id) else {
            return false;
        };

        let before = user_rows.len();
        user_rows.retain(|row| {
            !(row.get("role").and_then(Value::as_str) == Some(role)
                && row.get(&self.context_column).and_then(Value::as_str) == Some(context))
        });
        before != user_rows.len()
    }

    /// Remove every assignment of a user
    pub async fn revoke_all(&self, user_id: &str) {
        self.rows.write().await.remove(user_id);
    }
}

impl Default for InMemoryRoleSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleSource for InMemoryRoleSource {
    async fn query_roles(&self, user_id: &str) -> Result<Vec<RoleRow>> {
        let rows = self.rows.read().await;
        Ok(rows.get(user_id).cloned().unwrap_or_default())
    }
}

/// Loads and parses the roles of one identity
///
/// Used as the read-through loader of the
/// [`RoleCache`](crate::cache::RoleCache).
#[derive(Clone)]
pub struct RoleLoader {
    source: Arc<dyn RoleSource>,
    parser: RoleParser,
}

impl RoleLoader {
    pub fn new(source: Arc<dyn RoleSource>, parser: RoleParser) -> Self {
        Self { source, parser }
    }

    pub async fn load(&self, user_id: &str) -> Result<Option<RoleMapping>> {
        let rows = self.source.query_roles(user_id).await?;
        let mapping = self.parser.parse_rows(&rows);

        debug!(
            user_id = %user_id,
            rows = rows.len(),
            contexts = mapping.as_ref().map_or(0, RoleMapping::len),
            "Loaded roles"
        );

        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn parser() -> RoleParser {
        let known: BTreeMap<Role, String> = [("admin", "Admin"), ("editor", "Editor")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RoleParser::new(known, "!", false)
    }

    #[tokio::test]
    async fn test_grant_and_revoke() {
        let source = InMemoryRoleSource::new();
        source.grant("alice", "admin", "acme").await;
        source.grant("alice", "editor", "globex").await;

        assert_eq!(source.query_roles("alice").await.unwrap().len(), 2);
        assert!(source.query_roles("bob").await.unwrap().is_empty());

        assert!(source.revoke("alice", "admin", "acme").await);
        assert!(!source.revoke("alice", "admin", "acme").await);
        assert_eq!(source.query_roles("alice").await.unwrap().len(), 1);

        source.revoke_all("alice").await;
        assert!(source.query_roles("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_loader_parses_rows() {
        let source = Arc::new(InMemoryRoleSource::with_context_column("tenant"));
        source.grant("alice", "admin", "acme").await;
        source.grant("alice", "ghost", "acme").await;

        let loader = RoleLoader::new(source, parser().with_context_column("tenant"));

        let mapping = loader.load("alice").await.unwrap().unwrap();
        assert_eq!(mapping, RoleMapping::single("acme", "admin"));
        assert!(loader.load("bob").await.unwrap().is_none());
    }
}

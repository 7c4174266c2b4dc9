//! Role-store record parsing
//!
//! Groups raw role assignments into a [`RoleMapping`], dropping blank roles
//! and (unless configured otherwise) roles that are not known.

use crate::config::{ResolvedConfig, DEFAULT_CONTEXT_COLUMN};
use crate::types::{Context, Role, RoleMapping, RoleRow};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// A single role assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    pub role: Option<Role>,
    pub context: Option<Context>,
}

impl RoleRecord {
    pub fn new(role: impl Into<Role>, context: impl Into<Context>) -> Self {
        Self {
            role: Some(role.into()),
            context: Some(context.into()),
        }
    }

    /// Read a record from a raw row, taking the context from `context_column`
    pub fn from_row(row: &RoleRow, context_column: &str) -> Self {
        let column = if context_column.is_empty() {
            DEFAULT_CONTEXT_COLUMN
        } else {
            context_column
        };

        Self {
            role: row.get("role").and_then(normalize_name),
            context: row.get(column).and_then(normalize_name),
        }
    }
}

/// Normalize a role or context value
///
/// Strings are trimmed and a leading keyword colon is dropped, so `":admin"`
/// and `"admin"` name the same role. Blank strings and non-scalar values are
/// treated as absent.
pub(crate) fn normalize_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => normalize_str(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn normalize_str(raw: &str) -> Option<String> {
    let name = raw.trim();
    let name = name.strip_prefix(':').unwrap_or(name);
    (!name.is_empty()).then(|| name.to_string())
}

/// Parser settings derived from configuration
#[derive(Debug, Clone)]
pub struct RoleParser {
    known_roles: BTreeMap<Role, String>,
    global_context: Context,
    context_column: String,
    keep_unknown: bool,
}

impl RoleParser {
    pub fn new(
        known_roles: BTreeMap<Role, String>,
        global_context: impl Into<Context>,
        keep_unknown: bool,
    ) -> Self {
        Self {
            known_roles,
            global_context: global_context.into(),
            context_column: DEFAULT_CONTEXT_COLUMN.to_string(),
            keep_unknown,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(
            config.known_roles.clone(),
            config.global_context.clone(),
            config.keep_unknown,
        )
        .with_context_column(config.context_column.clone())
    }

    pub fn with_context_column(mut self, column: impl Into<String>) -> Self {
        self.context_column = column.into();
        self
    }

    /// Parse raw store rows
    pub fn parse_rows(&self, rows: &[RoleRow]) -> Option<RoleMapping> {
        self.parse(
            rows.iter()
                .map(|row| RoleRecord::from_row(row, &self.context_column)),
        )
    }

    /// Parse records into a mapping; `None` when no record survives
    ///
    /// Names are normalized like raw row values. A record with a blank role is
    /// dropped; one with a blank or missing context goes to the global context.
    pub fn parse(&self, records: impl IntoIterator<Item = RoleRecord>) -> Option<RoleMapping> {
        let mut mapping = RoleMapping::new();
        let mut dropped = 0usize;

        for record in records {
            let Some(role) = record.role.as_deref().and_then(normalize_str) else {
                dropped += 1;
                continue;
            };

            if !self.keep_unknown && !self.known_roles.contains_key(&role) {
                dropped += 1;
                continue;
            }

            let context = record
                .context
                .as_deref()
                .and_then(normalize_str)
                .unwrap_or_else(|| self.global_context.clone());
            mapping.insert(context, role);
        }

        if dropped > 0 {
            debug!(dropped, "Dropped blank or unknown role records");
        }

        (!mapping.is_empty()).then_some(mapping)
    }
}

/// Group role records by context
///
/// Convenience form of [`RoleParser::parse`] for one-off use.
pub fn parse_roles(
    records: impl IntoIterator<Item = RoleRecord>,
    known_roles: &BTreeMap<Role, String>,
    global_context: &str,
    keep_unknown: bool,
) -> Option<RoleMapping> {
    RoleParser::new(known_roles.clone(), global_context, keep_unknown).parse(records)
}

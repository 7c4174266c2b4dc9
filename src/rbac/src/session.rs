//! Session collaborator interface
//!
//! Sessions are created and authenticated elsewhere; the request processor
//! only needs to know whether a session is valid and who it belongs to.

use crate::error::Result;
use crate::types::UserId;
use async_trait::async_trait;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session as seen by access control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Option<String>,
    pub user_id: Option<UserId>,
    pub valid: bool,
}

impl Session {
    /// Valid session of a user
    pub fn authenticated(id: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self {
            id: Some(id.into()),
            user_id: Some(user_id.into()),
            valid: true,
        }
    }

    /// Session that still names its user but is no longer valid
    pub fn expired(id: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self {
            valid: false,
            ..Self::authenticated(id, user_id)
        }
    }

    /// Identity carried by the session, valid or not
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Valid session carrying both a session id and a user id
    pub fn is_authenticated(&self) -> bool {
        self.valid
            && self.id.as_deref().is_some_and(|id| !id.is_empty())
            && self.user_id().is_some()
    }
}

/// Looks up the session of a request
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn session_of(&self, parts: &Parts, session_key: &str) -> Result<Option<Session>>;
}

/// Reads a [`Session`] placed in request extensions by upstream middleware
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionSessionResolver;

#[async_trait]
impl SessionResolver for ExtensionSessionResolver {
    async fn session_of(&self, parts: &Parts, _session_key: &str) -> Result<Option<Session>> {
        Ok(parts.extensions.get::<Session>().cloned())
    }
}

/// In-memory sessions addressed by a cookie named after the session key
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a valid session for a user
    pub fn create(&self, user_id: impl Into<UserId>) -> Session {
        let session = Session::authenticated(Uuid::new_v4().to_string(), user_id);
        if let Some(id) = &session.id {
            self.sessions.insert(id.clone(), session.clone());
        }
        session
    }

    /// Mark a session invalid, keeping its user; returns `false` if unknown
    pub fn expire(&self, session_id: &str) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut session) => {
                session.valid = false;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, session_id: &str) -> Option<Session> {
        self.sessions.remove(session_id).map(|(_, session)| session)
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).map(|s| s.clone())
    }
}

#[async_trait]
impl SessionResolver for InMemorySessionStore {
    async fn session_of(&self, parts: &Parts, session_key: &str) -> Result<Option<Session>> {
        Ok(cookie_value(&parts.headers, session_key).and_then(|id| self.get(id)))
    }
}

/// Value of the named cookie
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|cookie| {
            cookie
                .trim()
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
        })
}

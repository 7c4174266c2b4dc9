//! Read-through role cache with LRU eviction and TTL expiry
//!
//! Loads run outside the cache lock, so concurrent misses for the same
//! identity may each invoke their loader. Role queries are idempotent, so the
//! duplicated work only costs latency. An invalidation bumps a generation
//! counter; a load that overlapped an invalidation is handed to its caller
//! but never stored, so a completed `invalidate` cannot be undone by a load
//! that started before it.

use crate::error::Result;
use crate::types::{RoleMapping, UserId};
use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of identities in the cache
    pub capacity: usize,

    /// Time-to-live for cached role mappings
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl: Duration::from_secs(60),
        }
    }
}

/// Resolved roles of one identity; `None` when the identity holds no roles
pub type CachedRoles = Option<Arc<RoleMapping>>;

/// Cached entry with TTL
#[derive(Clone)]
struct CachedEntry {
    roles: CachedRoles,
    cached_at: Instant,
}

impl CachedEntry {
    fn new(roles: CachedRoles) -> Self {
        Self {
            roles,
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

struct CacheState {
    entries: LruCache<UserId, CachedEntry>,
    generation: u64,
    stats: CacheStats,
}

impl CacheState {
    fn lookup(&mut self, user_id: &str, ttl: Duration) -> Option<CachedRoles> {
        let expired = match self.entries.get(user_id) {
            Some(entry) if !entry.is_expired(ttl) => {
                self.stats.hits += 1;
                return Some(entry.roles.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.pop(user_id);
            self.stats.expirations += 1;
        }
        self.stats.misses += 1;
        None
    }
}

/// Role cache keyed by user identifier
///
/// Owned by the request processor and shared through `Arc`; created at
/// startup and cleared with [`RoleCache::clear`] at shutdown.
pub struct RoleCache {
    state: Mutex<CacheState>,
    config: CacheConfig,
}

impl RoleCache {
    /// Create a new role cache
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                generation: 0,
                stats: CacheStats::default(),
            }),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the cached roles of `user_id`, loading them on miss or expiry
    ///
    /// A successful load is stored even when it yields no roles. A failed
    /// load is returned as an error and leaves the cache untouched.
    pub async fn resolve<F, Fut>(&self, user_id: &str, loader: F) -> Result<CachedRoles>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<RoleMapping>>>,
    {
        let generation = {
            let mut state = self.state.lock().await;
            if let Some(roles) = state.lookup(user_id, self.config.ttl) {
                return Ok(roles);
            }
            state.generation
        };

        debug!(user_id = %user_id, "Role cache miss, loading roles");

        let roles = match loader().await {
            Ok(mapping) => mapping.map(Arc::new),
            Err(e) => {
                warn!(user_id = %user_id, "Role loading failed: {}", e);
                return Err(e);
            }
        };

        let mut state = self.state.lock().await;
        if state.generation == generation {
            state
                .entries
                .put(user_id.to_string(), CachedEntry::new(roles.clone()));
        } else {
            debug!(user_id = %user_id, "Cache invalidated during load, result not stored");
        }

        Ok(roles)
    }

    /// Drop the cached roles of `user_id`
    ///
    /// Returns `true` if an entry was present.
    pub async fn invalidate(&self, user_id: &str) -> bool {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.stats.invalidations += 1;
        let removed = state.entries.pop(user_id).is_some();

        info!(user_id = %user_id, removed, "Role cache entry invalidated");
        removed
    }

    /// Clear the entire cache
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.entries.clear();
        state.stats = CacheStats::default();

        info!("Role cache cleared");
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            entries: state.entries.len(),
            max_entries: self.config.capacity,
            ..state.stats.clone()
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub expirations: usize,
    pub invalidations: usize,
    pub entries: usize,
    pub max_entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

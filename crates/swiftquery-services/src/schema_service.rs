//! Schema browsing with caching
//!
//! Loads the schema tree through the backend and keeps it for a TTL so the
//! browser does not hit the backend on every expand.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use swiftquery_core::{ObjectNode, QueryBackend, SchemaTree};

use crate::error::{ServiceError, ServiceResult};

struct CachedTree {
    tree: Arc<SchemaTree>,
    cached_at: Instant,
}

/// Service for schema tree loading and lookup
pub struct SchemaService {
    backend: Arc<dyn QueryBackend>,
    cache: RwLock<Option<CachedTree>>,
    ttl: Duration,
}

impl SchemaService {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self::with_ttl(backend, Duration::from_secs(300))
    }

    pub fn with_ttl(backend: Arc<dyn QueryBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            cache: RwLock::new(None),
            ttl,
        }
    }

    /// Check if the cached tree is still fresh
    pub fn is_valid(&self) -> bool {
        self.cache
            .read()
            .as_ref()
            .is_some_and(|cached| cached.cached_at.elapsed() < self.ttl)
    }

    /// Load the schema tree, reusing the cached one while it is fresh
    #[tracing::instrument(skip(self), fields(backend = %self.backend.name()))]
    pub async fn load(&self) -> ServiceResult<Arc<SchemaTree>> {
        if self.is_valid()
            && let Some(tree) = self.cached()
        {
            tracing::debug!("schema cache hit");
            return Ok(tree);
        }
        tracing::debug!("schema cache miss, loading from backend");
        self.fetch().await
    }

    /// Reload the schema tree regardless of the cache
    #[tracing::instrument(skip(self), fields(backend = %self.backend.name()))]
    pub async fn refresh(&self) -> ServiceResult<Arc<SchemaTree>> {
        self.invalidate();
        self.fetch().await
    }

    async fn fetch(&self) -> ServiceResult<Arc<SchemaTree>> {
        let tree = self.backend.list_schema().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to load schema");
            ServiceError::SchemaLoadFailed(e.user_message())
        })?;
        let tree = Arc::new(tree);
        tracing::info!(objects = tree.objects().count(), "schema loaded");
        *self.cache.write() = Some(CachedTree {
            tree: tree.clone(),
            cached_at: Instant::now(),
        });
        Ok(tree)
    }

    /// Last loaded tree, fresh or not
    pub fn cached(&self) -> Option<Arc<SchemaTree>> {
        self.cache.read().as_ref().map(|cached| cached.tree.clone())
    }

    pub fn invalidate(&self) {
        if self.cache.write().take().is_some() {
            tracing::debug!("invalidated schema cache");
        }
    }

    /// Look up a table or view (with its columns) in the schema tree
    pub async fn find_object(&self, schema: &str, name: &str) -> ServiceResult<ObjectNode> {
        let tree = self.load().await?;
        tree.find_object(schema, name)
            .cloned()
            .ok_or_else(|| ServiceError::ObjectNotFound(format!("{}.{}", schema, name)))
    }
}

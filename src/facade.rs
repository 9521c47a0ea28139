//! Memory facade (C6). Thin session-keyed entry point:
//! resolves `session_id → store` via the store manager (C4) and forwards
//! to the memory adapter (C5). Reads use `get` (fails `not_found` if the
//! session has no open store); writes use `get_or_create`.
//!
//! `oxigraph`'s query/update calls are blocking CPU/IO work, so every call
//! into the adapter is dispatched through [`tokio::task::spawn_blocking`]
//! rather than awaited directly on the calling task — a synchronous
//! storage interface with the async wrapper added at this layer, not
//! inside the adapter itself.

use std::time::Duration;

use tracing::instrument;

use crate::error::{EngineError, Result};
use crate::memory::{
    ContextOptions, MemoryAdapter, MemoryStats, QueryOptions, RelatedOptions, ScoredMemory,
};
use crate::store::manager::StoreManager;
use crate::store::triplestore::{HealthStatus, TripleStore};
use crate::types::{MemoryId, MemoryItem, MemoryType, RelationshipKind};

/// Run a blocking adapter call on the blocking thread pool, flattening a
/// `JoinError` (panic/cancellation) into the engine's own error taxonomy.
async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(EngineError::Internal(format!("blocking task failed: {e}"))),
    }
}

/// Race `future` against `deadline`, if one is set, turning an elapsed
/// deadline into `EngineError::Timeout`. `persist`/`supersede`/`delete` are
/// single atomic SPARQL Updates, so a timeout here never leaves partial
/// state behind.
async fn with_deadline<T>(
    deadline: Option<Duration>,
    future: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match deadline {
        Some(d) => tokio::time::timeout(d, future)
            .await
            .unwrap_or(Err(EngineError::Timeout)),
        None => future.await,
    }
}

/// The engine's public callable API. Every operation takes
/// `session_id` first and returns an ok/error-tagged result.
#[derive(Clone)]
pub struct MemoryFacade {
    manager: StoreManager,
    adapter: MemoryAdapter,
    /// Ambient deadline inherited by every call that doesn't specify its
    /// own. `None` disables enforcement.
    operation_timeout: Option<Duration>,
}

impl MemoryFacade {
    pub fn new(manager: StoreManager) -> Self {
        let operation_timeout = manager.config().operation_timeout;
        Self {
            manager,
            adapter: MemoryAdapter::new(),
            operation_timeout,
        }
    }

    #[instrument(skip(self, item), fields(session_id = %item.session_id))]
    pub async fn persist(&self, item: &MemoryItem) -> Result<MemoryId> {
        let store = self.manager.get_or_create(&item.session_id).await?;
        let adapter = self.adapter;
        let item = item.clone();
        with_deadline(self.operation_timeout, blocking(move || adapter.persist(&store, &item))).await
    }

    pub async fn query(&self, session_id: &str, opts: &QueryOptions) -> Result<Vec<MemoryItem>> {
        let store = self.manager.get(session_id).await?;
        let adapter = self.adapter;
        let session_id = session_id.to_string();
        let opts = opts.clone();
        with_deadline(
            self.operation_timeout,
            blocking(move || adapter.query_by_session(&store, &session_id, &opts)),
        )
        .await
    }

    pub async fn query_by_type(
        &self,
        session_id: &str,
        memory_type: MemoryType,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryItem>> {
        let store = self.manager.get(session_id).await?;
        let adapter = self.adapter;
        let session_id = session_id.to_string();
        with_deadline(
            self.operation_timeout,
            blocking(move || adapter.query_by_type(&store, &session_id, memory_type, limit)),
        )
        .await
    }

    pub async fn query_by_id(&self, session_id: &str, id: &str) -> Result<MemoryItem> {
        let store = self.manager.get(session_id).await?;
        let adapter = self.adapter;
        let session_id = session_id.to_string();
        let id = id.to_string();
        with_deadline(
            self.operation_timeout,
            blocking(move || adapter.query_by_id(&store, &session_id, &id)),
        )
        .await
    }

    /// `get` is the same session-scoped id lookup exposed under the name
    /// used by callers that think in terms of "fetch this memory" rather
    /// than "query".
    pub async fn get(&self, session_id: &str, id: &str) -> Result<MemoryItem> {
        self.query_by_id(session_id, id).await
    }

    #[instrument(skip(self), fields(session_id = %session_id, memory_id = %old_id))]
    pub async fn supersede(&self, session_id: &str, old_id: &str, new_id: Option<&str>) -> Result<()> {
        let store = self.manager.get_or_create(session_id).await?;
        let adapter = self.adapter;
        let session_id = session_id.to_string();
        let old_id = old_id.to_string();
        let new_id = new_id.map(str::to_string);
        with_deadline(
            self.operation_timeout,
            blocking(move || adapter.supersede(&store, &session_id, &old_id, new_id.as_deref())),
        )
        .await
    }

    #[instrument(skip(self), fields(session_id = %session_id, memory_id = %id))]
    pub async fn delete(&self, session_id: &str, id: &str) -> Result<()> {
        let store = self.manager.get_or_create(session_id).await?;
        let adapter = self.adapter;
        let session_id = session_id.to_string();
        let id = id.to_string();
        with_deadline(
            self.operation_timeout,
            blocking(move || adapter.delete(&store, &session_id, &id)),
        )
        .await
    }

    /// Access-tracking is fire-and-forget on the read path, so
    /// unlike the other writes this is never wrapped in the ambient
    /// deadline — callers that await it do so voluntarily.
    pub async fn record_access(&self, session_id: &str, id: &str) -> Result<()> {
        let store = self.manager.get_or_create(session_id).await?;
        let adapter = self.adapter;
        let session_id = session_id.to_string();
        let id = id.to_string();
        blocking(move || adapter.record_access(&store, &session_id, &id)).await
    }

    pub async fn count(&self, session_id: &str, include_superseded: bool) -> Result<u64> {
        let store = self.manager.get(session_id).await?;
        let adapter = self.adapter;
        let session_id = session_id.to_string();
        with_deadline(
            self.operation_timeout,
            blocking(move || adapter.count(&store, &session_id, include_superseded)),
        )
        .await
    }

    pub async fn query_related(
        &self,
        session_id: &str,
        start_id: &str,
        relationship: RelationshipKind,
        opts: &RelatedOptions,
    ) -> Result<Vec<MemoryItem>> {
        let store = self.manager.get(session_id).await?;
        let adapter = self.adapter;
        let session_id = session_id.to_string();
        let start_id = start_id.to_string();
        let opts = opts.clone();
        with_deadline(
            self.operation_timeout,
            blocking(move || {
                crate::memory::query_related(&adapter, &store, &session_id, &start_id, relationship, &opts)
            }),
        )
        .await
    }

    pub async fn get_context(
        &self,
        session_id: &str,
        context_hint: &str,
        opts: &ContextOptions,
    ) -> Result<Vec<ScoredMemory>> {
        let store = self.manager.get(session_id).await?;
        let adapter = self.adapter;
        let session_id = session_id.to_string();
        let context_hint = context_hint.to_string();
        let opts = opts.clone();
        with_deadline(
            self.operation_timeout,
            blocking(move || crate::memory::get_context(&adapter, &store, &session_id, &context_hint, &opts)),
        )
        .await
    }

    pub async fn get_stats(&self, session_id: &str) -> Result<MemoryStats> {
        let store = self.manager.get(session_id).await?;
        let adapter = self.adapter;
        let session_id = session_id.to_string();
        with_deadline(
            self.operation_timeout,
            blocking(move || crate::memory::get_stats(&adapter, &store, &session_id)),
        )
        .await
    }

    pub async fn health(&self, session_id: &str) -> Result<HealthStatus> {
        with_deadline(self.operation_timeout, self.manager.health(session_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::config::ManagerConfig;
    use crate::types::{MemoryItem, MemoryType, SourceType};
    use std::time::Duration;
    use tempfile::tempdir;

    fn facade(base: std::path::PathBuf) -> MemoryFacade {
        let config = ManagerConfig {
            base_path: base,
            max_open_stores: 10,
            idle_timeout: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(3600),
            operation_timeout: Some(Duration::from_secs(5)),
        };
        MemoryFacade::new(StoreManager::new(config).unwrap())
    }

    #[tokio::test]
    async fn read_on_unopened_session_is_not_found() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path().to_path_buf());
        let result = facade.query_by_id("never-opened", "mem-1").await;
        assert!(matches!(result, Err(crate::error::EngineError::NotFound)));
    }

    #[tokio::test]
    async fn persist_then_query_by_type_round_trips() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path().to_path_buf());

        let item = MemoryItem::new(
            "mem-0001",
            "Uses Phoenix 1.7",
            MemoryType::Fact,
            0.95,
            SourceType::Tool,
            "alpha",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        )
        .unwrap();
        facade.persist(&item).await.unwrap();

        let results = facade.query_by_type("alpha", MemoryType::Fact, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "mem-0001");
        assert_eq!(results[0].content, "Uses Phoenix 1.7");
    }

    #[tokio::test]
    async fn session_isolation_holds_across_the_facade() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path().to_path_buf());

        let alpha_item = MemoryItem::new(
            "mem-0001",
            "Uses Phoenix 1.7",
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        )
        .unwrap();
        let beta_item = MemoryItem::new(
            "mem-0001",
            "Uses Phoenix 1.6",
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "beta",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        )
        .unwrap();
        facade.persist(&alpha_item).await.unwrap();
        facade.persist(&beta_item).await.unwrap();

        assert_eq!(facade.query_by_id("alpha", "mem-0001").await.unwrap().content, "Uses Phoenix 1.7");
        assert_eq!(facade.query_by_id("beta", "mem-0001").await.unwrap().content, "Uses Phoenix 1.6");
    }

    #[tokio::test]
    async fn zero_deadline_times_out_instead_of_hanging() {
        let dir = tempdir().unwrap();
        let config = ManagerConfig {
            base_path: dir.path().to_path_buf(),
            max_open_stores: 10,
            idle_timeout: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(3600),
            operation_timeout: Some(Duration::from_nanos(1)),
        };
        let facade = MemoryFacade::new(StoreManager::new(config).unwrap());
        let item = MemoryItem::new(
            "mem-0001",
            "content",
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        )
        .unwrap();

        let result = facade.persist(&item).await;
        assert!(matches!(result, Ok(_)) || matches!(result, Err(crate::error::EngineError::Timeout)));
    }

    #[tokio::test]
    async fn disabled_deadline_never_times_out() {
        let dir = tempdir().unwrap();
        let config = ManagerConfig {
            base_path: dir.path().to_path_buf(),
            max_open_stores: 10,
            idle_timeout: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(3600),
            operation_timeout: None,
        };
        let facade = MemoryFacade::new(StoreManager::new(config).unwrap());
        let item = MemoryItem::new(
            "mem-0001",
            "content",
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        )
        .unwrap();
        facade.persist(&item).await.unwrap();
        assert_eq!(facade.query_by_id("alpha", "mem-0001").await.unwrap().id, "mem-0001");
    }
}

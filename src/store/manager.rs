//! Store lifecycle manager (C4). Owns the
//! `session_id → store handle + metadata` mapping, enforces path
//! containment, capacity, idle eviction, and graceful shutdown.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::ontology;
use crate::store::config::ManagerConfig;
use crate::store::handle::{StoreEntry, StoreMetadata};
use crate::store::triplestore::{HealthStatus, OxigraphStore, TripleStore};
use crate::types::{validate_session_id, SessionId};

struct ManagerState {
    stores: HashMap<SessionId, StoreEntry>,
    /// Touch-order list, least-recently-used at the front. Kept small by
    /// `max_open_stores`, so a `Vec` is sufficient at this bound.
    touch_order: Vec<SessionId>,
}

impl ManagerState {
    fn touch(&mut self, session_id: &str) {
        self.touch_order.retain(|s| s != session_id);
        self.touch_order.push(session_id.to_string());
    }

    fn remove(&mut self, session_id: &str) {
        self.touch_order.retain(|s| s != session_id);
        self.stores.remove(session_id);
    }
}

/// Owns every open per-session store. Cloning a `StoreManager` clones the
/// `Arc` around its state, so all clones share the same open-stores map.
/// Single-owner semantics come from funneling every call through one
/// `tokio::sync::Mutex`, not from restricting the number of handles to
/// the manager itself.
#[derive(Clone)]
pub struct StoreManager {
    state: Arc<Mutex<ManagerState>>,
    config: ManagerConfig,
}

impl StoreManager {
    /// Construct a manager and spawn its idle-cleanup background task.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.base_path)?;
        let state = Arc::new(Mutex::new(ManagerState {
            stores: HashMap::new(),
            touch_order: Vec::new(),
        }));

        let manager = Self { state, config };
        manager.spawn_idle_cleanup();
        Ok(manager)
    }

    /// The configuration this manager was constructed with.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn spawn_idle_cleanup(&self) {
        let state = self.state.clone();
        let idle_timeout = self.config.idle_timeout;
        let cleanup_interval = self.config.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cleanup_interval);
            loop {
                ticker.tick().await;
                let mut guard = state.lock().await;
                let now = Utc::now();
                let stale: Vec<SessionId> = guard
                    .stores
                    .iter()
                    .filter(|(_, entry)| {
                        now.signed_duration_since(entry.last_accessed)
                            .to_std()
                            .map(|d| d >= idle_timeout)
                            .unwrap_or(false)
                    })
                    .map(|(id, _)| id.clone())
                    .collect();
                for session_id in stale {
                    if let Some(entry) = guard.stores.get(&session_id) {
                        if let Err(e) = entry.handle.close() {
                            warn!(session_id, error = %e, "idle cleanup: error closing store");
                        }
                    }
                    guard.remove(&session_id);
                    info!(session_id, "idle cleanup: closed store");
                }
            }
        });
    }

    /// Absolute directory within which every per-session store lives.
    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        let raw = self.config.base_path.join(format!("session_{session_id}"));
        std::fs::create_dir_all(&raw)?;
        let canonical_session = raw
            .canonicalize()
            .map_err(|e| EngineError::PathTraversalDetected(e.to_string()))?;
        let canonical_base = self
            .config
            .base_path
            .canonicalize()
            .map_err(|e| EngineError::PathTraversalDetected(e.to_string()))?;
        if !canonical_session.starts_with(&canonical_base) || canonical_session == canonical_base {
            return Err(EngineError::PathTraversalDetected(format!(
                "resolved path {} escapes base path {}",
                canonical_session.display(),
                canonical_base.display()
            )));
        }
        Ok(canonical_session)
    }

    /// Open (creating if necessary) the store for `session_id`, loading the
    /// ontology on first open. Updates `last_accessed`.
    pub async fn get_or_create(&self, session_id: &str) -> Result<OxigraphStore> {
        validate_session_id(session_id)?;

        {
            let mut guard = self.state.lock().await;
            if let Some(entry) = guard.stores.get_mut(session_id) {
                entry.last_accessed = Utc::now();
                guard.touch(session_id);
                return Ok(guard.stores[session_id].handle.clone());
            }
        }

        let path = self.session_path(session_id)?;

        {
            let mut guard = self.state.lock().await;
            if guard.stores.len() >= self.config.max_open_stores && !guard.stores.contains_key(session_id) {
                if let Some(lru) = guard.touch_order.first().cloned() {
                    if let Some(entry) = guard.stores.get(&lru) {
                        if let Err(e) = entry.handle.close() {
                            warn!(session_id = lru, error = %e, "eviction: error closing store");
                        }
                    }
                    guard.remove(&lru);
                    info!(session_id = lru, "evicted least-recently-used store at capacity");
                }
            }
        }

        let handle = OxigraphStore::open(&path, true)?;
        ontology::ensure_loaded(&handle).map_err(|e| {
            let _ = handle.close();
            EngineError::OntologyLoadFailed(e.to_string())
        })?;

        let now = Utc::now();
        let entry = StoreEntry {
            handle: handle.clone(),
            opened_at: now,
            last_accessed: now,
        };

        let mut guard = self.state.lock().await;
        guard.stores.insert(session_id.to_string(), entry);
        guard.touch(session_id);

        Ok(handle)
    }

    /// Lookup-only; `not_found` if absent. Touches `last_accessed`.
    pub async fn get(&self, session_id: &str) -> Result<OxigraphStore> {
        validate_session_id(session_id)?;
        let mut guard = self.state.lock().await;
        match guard.stores.get_mut(session_id) {
            Some(entry) => {
                entry.last_accessed = Utc::now();
                guard.touch(session_id);
                Ok(guard.stores[session_id].handle.clone())
            }
            None => Err(EngineError::NotFound),
        }
    }

    /// Remove and close the entry for `session_id`. Idempotent.
    pub async fn close(&self, session_id: &str) -> Result<()> {
        let mut guard = self.state.lock().await;
        if let Some(entry) = guard.stores.get(session_id) {
            entry.handle.close()?;
        }
        guard.remove(session_id);
        Ok(())
    }

    /// Close every open store, with a bounded per-store deadline. Individual
    /// close errors are logged, never propagated.
    pub async fn close_all(&self) {
        let session_ids: Vec<SessionId> = {
            let guard = self.state.lock().await;
            guard.stores.keys().cloned().collect()
        };
        for session_id in session_ids {
            let result = tokio::time::timeout(Duration::from_secs(5), self.close(&session_id)).await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(session_id, error = %e, "close_all: error closing store"),
                Err(_) => warn!(session_id, "close_all: timed out closing store"),
            }
        }
    }

    /// Probe a session's store health, normalized to the manager's own
    /// error taxonomy.
    pub async fn health(&self, session_id: &str) -> Result<HealthStatus> {
        let handle = self.get(session_id).await?;
        match handle.health()? {
            HealthStatus::Healthy => Ok(HealthStatus::Healthy),
            HealthStatus::Unhealthy(reason) => Err(EngineError::Unhealthy(reason)),
        }
    }

    /// All currently open session ids.
    pub async fn list_open(&self) -> Vec<SessionId> {
        let guard = self.state.lock().await;
        guard.stores.keys().cloned().collect()
    }

    /// Whether a store is currently open for `session_id`.
    pub async fn is_open(&self, session_id: &str) -> bool {
        let guard = self.state.lock().await;
        guard.stores.contains_key(session_id)
    }

    /// Bookkeeping snapshot for an open session.
    pub async fn get_metadata(&self, session_id: &str) -> Result<StoreMetadata> {
        let guard = self.state.lock().await;
        guard
            .stores
            .get(session_id)
            .map(|entry| entry.metadata(session_id))
            .ok_or(EngineError::NotFound)
    }
}

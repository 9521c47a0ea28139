//! Types tracked per open session store by the lifecycle manager (C4).

use chrono::{DateTime, Utc};

use crate::store::triplestore::OxigraphStore;

/// An open store plus the bookkeeping the manager needs for LRU eviction
/// and idle cleanup.
#[derive(Clone)]
pub struct StoreEntry {
    pub handle: OxigraphStore,
    pub opened_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

/// Read-only snapshot of a [`StoreEntry`], returned by
/// `StoreManager::get_metadata`.
#[derive(Debug, Clone)]
pub struct StoreMetadata {
    pub session_id: String,
    pub opened_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl StoreEntry {
    pub fn metadata(&self, session_id: &str) -> StoreMetadata {
        StoreMetadata {
            session_id: session_id.to_string(),
            opened_at: self.opened_at,
            last_accessed: self.last_accessed,
        }
    }
}

//! Session statistics. A single pass over a session's memories
//! producing aggregate counts by lifecycle state, type, and confidence band.

use std::collections::HashMap;

use tracing::instrument;

use crate::error::Result;
use crate::memory::adapter::{MemoryAdapter, QueryOptions};
use crate::store::triplestore::OxigraphStore;
use crate::types::{confidence_band, ConfidenceBand, MemoryType};

/// `get_stats(session_id)` result.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    pub total_count: u64,
    pub superseded_count: u64,
    pub by_type: HashMap<MemoryType, u64>,
    pub by_confidence: HashMap<ConfidenceBand, u64>,
    pub with_evidence: u64,
    pub with_rationale: u64,
}

/// `get_stats(session_id)`: a single pass over every row
/// in the session (active and superseded) computing the aggregate counts.
#[instrument(skip(adapter, store), fields(session_id = %session_id))]
pub fn get_stats(adapter: &MemoryAdapter, store: &OxigraphStore, session_id: &str) -> Result<MemoryStats> {
    let all = adapter.query_by_session(
        store,
        session_id,
        &QueryOptions {
            min_confidence: 0.0,
            limit: None,
            include_superseded: true,
            memory_type: None,
        },
    )?;

    let mut stats = MemoryStats::default();
    for item in &all {
        if item.is_active() {
            stats.total_count += 1;
            *stats.by_type.entry(item.memory_type).or_insert(0) += 1;
            *stats.by_confidence.entry(confidence_band(item.confidence)).or_insert(0) += 1;
            if !item.evidence_refs.is_empty() {
                stats.with_evidence += 1;
            }
            if item.rationale.as_ref().is_some_and(|r| !r.is_empty()) {
                stats.with_rationale += 1;
            }
        } else {
            stats.superseded_count += 1;
        }
    }

    Ok(stats)
}

//! Related-memory traversal. Depth-first, visited-set-guarded
//! expansion over one of the five relationship kinds.

use std::collections::HashSet;

use tracing::instrument;

use crate::error::Result;
use crate::memory::adapter::MemoryAdapter;
use crate::query::templates;
use crate::store::triplestore::OxigraphStore;
use crate::types::{MemoryItem, RelationshipKind};

const MIN_DEPTH: u32 = 1;
const MAX_DEPTH: u32 = 5;

/// Options accepted by [`query_related`].
#[derive(Debug, Clone)]
pub struct RelatedOptions {
    pub depth: i64,
    pub limit: i64,
    pub include_superseded: bool,
}

impl Default for RelatedOptions {
    fn default() -> Self {
        Self {
            depth: 1,
            limit: 10,
            include_superseded: false,
        }
    }
}

fn clamp_depth(depth: i64) -> u32 {
    if depth < MIN_DEPTH as i64 {
        MIN_DEPTH
    } else if depth > MAX_DEPTH as i64 {
        MAX_DEPTH
    } else {
        depth as u32
    }
}

fn clamp_limit(limit: i64) -> usize {
    if limit < 1 {
        1
    } else {
        limit as usize
    }
}

/// `query_related(session_id, start_id, relationship, opts)`. Returns
/// the accumulated list of related memories in
/// depth-first traversal order, never revisiting the start memory or any
/// memory already visited in a sibling branch.
#[instrument(skip(adapter, store, opts), fields(session_id = %session_id, start_id = %start_id, relationship = %relationship))]
pub fn query_related(
    adapter: &MemoryAdapter,
    store: &OxigraphStore,
    session_id: &str,
    start_id: &str,
    relationship: RelationshipKind,
    opts: &RelatedOptions,
) -> Result<Vec<MemoryItem>> {
    let depth = clamp_depth(opts.depth);
    let limit = clamp_limit(opts.limit);

    // Resolve the start memory to propagate `not_found` before traversing.
    adapter.query_by_id(store, session_id, start_id)?;

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(start_id.to_string());
    let mut results = Vec::new();

    traverse_level(
        adapter,
        store,
        session_id,
        start_id,
        relationship,
        depth,
        limit,
        opts.include_superseded,
        &mut visited,
        &mut results,
    )?;

    Ok(results)
}

#[allow(clippy::too_many_arguments)]
fn traverse_level(
    adapter: &MemoryAdapter,
    store: &OxigraphStore,
    session_id: &str,
    current_id: &str,
    relationship: RelationshipKind,
    remaining_depth: u32,
    limit: usize,
    include_superseded: bool,
    visited: &mut HashSet<String>,
    results: &mut Vec<MemoryItem>,
) -> Result<()> {
    if remaining_depth == 0 {
        return Ok(());
    }

    let query = templates::query_related(session_id, current_id, relationship, include_superseded)?;
    let rows = store.select(&query)?;

    let mut candidate_ids: Vec<String> = rows
        .iter()
        .filter_map(|row| row.get("m").map(|t| extract_local_memory_id(t.as_str())))
        .filter(|id| !visited.contains(id))
        .collect();
    candidate_ids.truncate(limit);

    for id in candidate_ids {
        let resolved = match adapter.query_by_id(store, session_id, &id) {
            Ok(item) => item,
            Err(_) => continue,
        };
        visited.insert(id.clone());
        results.push(resolved);
        traverse_level(
            adapter,
            store,
            session_id,
            &id,
            relationship,
            remaining_depth - 1,
            limit,
            include_superseded,
            visited,
            results,
        )?;
    }

    Ok(())
}

fn extract_local_memory_id(iri: &str) -> String {
    iri.rsplit(['#', '/'])
        .next()
        .unwrap_or(iri)
        .strip_prefix("memory_")
        .unwrap_or(iri)
        .to_string()
}

//! Memory adapter (C5). The operational API over a single
//! open store: persist, the query family, supersede/delete/record-access,
//! and the bulk read helpers in [`crate::memory::stats`],
//! [`crate::memory::traversal`], and [`crate::memory::ranking`].
//!
//! Stateless: every method takes the store handle as an argument rather
//! than owning one — `&self` plus explicit arguments, no adapter-local
//! mutable state.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::error::{EngineError, Result};
use crate::query::templates;
use crate::registry;
use crate::store::triplestore::{Binding, OxigraphStore, Term, TripleStore};
use crate::types::{MemoryId, MemoryItem, MemoryType, SessionId, SourceType};

/// Options accepted by [`MemoryAdapter::query_by_session`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub min_confidence: f32,
    pub limit: Option<usize>,
    pub include_superseded: bool,
    pub memory_type: Option<MemoryType>,
}

/// The memory adapter. Holds no state; `&self` methods exist purely for
/// namespacing and so call sites read as `adapter.persist(...)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryAdapter;

impl MemoryAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Persist a full record.
    #[instrument(skip(self, store, item), fields(session_id = %item.session_id, memory_id = %item.id))]
    pub fn persist(&self, store: &OxigraphStore, item: &MemoryItem) -> Result<MemoryId> {
        let query = templates::insert_memory(item)?;
        store.update(&query)?;
        debug!("persisted memory");
        Ok(item.id.clone())
    }

    /// SELECT active (or all, if `include_superseded`) records for
    /// a session, always ordered by `created_at` descending.
    #[instrument(skip(self, store), fields(session_id = %session_id))]
    pub fn query_by_session(
        &self,
        store: &OxigraphStore,
        session_id: &str,
        opts: &QueryOptions,
    ) -> Result<Vec<MemoryItem>> {
        let query = match opts.memory_type {
            Some(mt) => templates::query_by_type(session_id, mt, opts.limit)?,
            None => templates::query_by_session(session_id, opts.min_confidence, opts.limit, opts.include_superseded)?,
        };
        let rows = store.select(&query)?;
        rows.iter().map(|row| self.memory_from_binding(store, row)).collect()
    }

    /// Session-scoped convenience wrapper; excludes superseded.
    pub fn query_by_type(
        &self,
        store: &OxigraphStore,
        session_id: &str,
        memory_type: MemoryType,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryItem>> {
        self.query_by_session(
            store,
            session_id,
            &QueryOptions {
                min_confidence: 0.0,
                limit,
                include_superseded: false,
                memory_type: Some(memory_type),
            },
        )
    }

    /// Internal id lookup, no session check.
    pub fn query_by_id_internal(&self, store: &OxigraphStore, id: &str) -> Result<MemoryItem> {
        let query = templates::query_by_id(id)?;
        let rows = store.select(&query)?;
        let row = rows.first().ok_or(EngineError::NotFound)?;
        self.memory_from_binding(store, row)
    }

    /// Public id lookup, enforcing session ownership. A mismatched
    /// session is indistinguishable from absence, to avoid cross-session
    /// probing.
    #[instrument(skip(self, store), fields(session_id = %session_id, memory_id = %id))]
    pub fn query_by_id(&self, store: &OxigraphStore, session_id: &str, id: &str) -> Result<MemoryItem> {
        let item = self.query_by_id_internal(store, id)?;
        if item.session_id != session_id {
            return Err(EngineError::NotFound);
        }
        Ok(item)
    }

    /// `SELECT COUNT`, never materializes rows.
    pub fn count(&self, store: &OxigraphStore, session_id: &str, include_superseded: bool) -> Result<u64> {
        let query = templates::count_query(session_id, include_superseded)?;
        let rows = store.select(&query)?;
        let count_str = rows
            .first()
            .and_then(|row| row.get("count"))
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| "0".to_string());
        count_str
            .parse::<u64>()
            .map_err(|e| EngineError::Store(format!("could not parse COUNT result: {e}")))
    }

    /// Supersede a record. Fetches `old_id` first to verify session
    /// ownership.
    #[instrument(skip(self, store), fields(session_id = %session_id, memory_id = %old_id))]
    pub fn supersede(
        &self,
        store: &OxigraphStore,
        session_id: &str,
        old_id: &str,
        new_id: Option<&str>,
    ) -> Result<()> {
        let existing = self.query_by_id_internal(store, old_id)?;
        if existing.session_id != session_id {
            return Err(EngineError::SessionMismatch);
        }
        let query = templates::supersede_memory(old_id, new_id, &Utc::now())?;
        store.update(&query)?;
        Ok(())
    }

    /// Delete a record. Missing id is `ok` (idempotent).
    #[instrument(skip(self, store), fields(session_id = %session_id, memory_id = %id))]
    pub fn delete(&self, store: &OxigraphStore, session_id: &str, id: &str) -> Result<()> {
        match self.query_by_id_internal(store, id) {
            Ok(existing) => {
                if existing.session_id != session_id {
                    return Err(EngineError::SessionMismatch);
                }
            }
            Err(EngineError::NotFound) => return Ok(()),
            Err(e) => return Err(e),
        }
        let query = templates::delete_memory(id)?;
        store.update(&query)?;
        Ok(())
    }

    /// Best-effort increment + timestamp. Missing id or session
    /// mismatch silently becomes `ok` — access tracking never blocks reads.
    pub fn record_access(&self, store: &OxigraphStore, session_id: &str, id: &str) -> Result<()> {
        match self.query_by_id_internal(store, id) {
            Ok(existing) if existing.session_id == session_id => {}
            _ => return Ok(()),
        }
        let query = templates::record_access(id, &Utc::now())?;
        if let Err(e) = store.update(&query) {
            debug!(error = %e, "record_access: swallowed underlying store error");
        }
        Ok(())
    }

    /// Parse one SELECT row plus its evidence-ref side-query into a
    /// [`MemoryItem`].
    fn memory_from_binding(&self, store: &OxigraphStore, row: &Binding) -> Result<MemoryItem> {
        let m_iri = get_iri(row, "m")?;
        let id = local_id_after(&m_iri, "memory_")?;

        let content = get_string(row, "content")?;
        let type_iri = get_iri(row, "type")?;
        let type_local = local_name(&type_iri);
        let memory_type = registry::class_to_memory_type(type_local)
            .ok_or_else(|| EngineError::Store(format!("unrecognized memory class: {type_local}")))?;
        let confidence: f32 = get_string(row, "confidence")?
            .parse()
            .map_err(|e| EngineError::Store(format!("could not parse confidence: {e}")))?;
        let source_type_tag = get_string(row, "sourceType")?;
        let source_type = registry::individual_to_source_type(&source_type_tag)
            .ok_or_else(|| EngineError::Store(format!("unrecognized source type: {source_type_tag}")))?;
        let session_id: SessionId = get_string(row, "sessionId")?;
        let created_at = get_datetime(row, "createdAt")?;

        let agent_id = get_opt_string(row, "agentId").map(Into::into);
        let project_id = get_opt_string(row, "projectId").map(Into::into);
        let rationale = get_opt_string(row, "rationale");
        let superseded_by = match row.get("supersededBy") {
            Some(term) => Some(local_id_after(term.as_str(), "memory_")?),
            None => None,
        };
        let superseded_at = match row.get("supersededAt") {
            Some(term) => Some(parse_datetime(term.as_str())?),
            None => None,
        };
        let access_count: u64 = get_string(row, "accessCount")?
            .parse()
            .map_err(|e| EngineError::Store(format!("could not parse accessCount: {e}")))?;
        let last_accessed = match row.get("lastAccessed") {
            Some(term) => Some(parse_datetime(term.as_str())?),
            None => None,
        };

        let evidence_query = templates::select_evidence_refs(&id)?;
        let evidence_rows = store.select(&evidence_query)?;
        let evidence_refs = evidence_rows
            .into_iter()
            .filter_map(|r| r.get("val").map(|t| t.as_str().to_string()))
            .collect();

        Ok(MemoryItem {
            id,
            content,
            memory_type,
            confidence,
            source_type,
            session_id,
            agent_id,
            project_id,
            rationale,
            evidence_refs,
            created_at,
            superseded_by,
            superseded_at,
            access_count,
            last_accessed,
        })
    }
}

fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

fn local_id_after(iri: &str, prefix: &str) -> Result<MemoryId> {
    let local = local_name(iri);
    Ok(local.strip_prefix(prefix).unwrap_or(local).to_string())
}

fn get_iri(row: &Binding, var: &str) -> Result<String> {
    match row.get(var) {
        Some(Term::Iri(s)) => Ok(s.clone()),
        Some(other) => Ok(other.as_str().to_string()),
        None => Err(EngineError::Store(format!("missing required binding: {var}"))),
    }
}

fn get_string(row: &Binding, var: &str) -> Result<String> {
    row.get(var)
        .map(|t| t.as_str().to_string())
        .ok_or_else(|| EngineError::Store(format!("missing required binding: {var}")))
}

fn get_opt_string(row: &Binding, var: &str) -> Option<String> {
    row.get(var).map(|t| t.as_str().to_string())
}

fn parse_datetime(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::Store(format!("could not parse datetime '{raw}': {e}")))
}

fn get_datetime(row: &Binding, var: &str) -> Result<DateTime<Utc>> {
    parse_datetime(&get_string(row, var)?)
}

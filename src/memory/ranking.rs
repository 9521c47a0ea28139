//! Context ranking. Scores a session's active memories against a
//! free-text hint using a fixed weighted blend of text overlap, recency,
//! confidence, and access frequency.

use std::collections::HashSet;

use chrono::Utc;
use regex::Regex;
use tracing::instrument;

use crate::error::Result;
use crate::memory::adapter::{MemoryAdapter, QueryOptions};
use crate::store::triplestore::OxigraphStore;
use crate::types::{MemoryItem, MemoryType};

/// Fixed scoring weights: `aw` (access), `cw`
/// (confidence). `rw` (recency) is caller-configurable via
/// [`ContextOptions::recency_weight`]; `tw` (text) absorbs the remainder.
const ACCESS_WEIGHT: f64 = 0.1;
const CONFIDENCE_WEIGHT: f64 = 0.2;

/// Seven-day half-life-like recency decay constant (seconds).
const RECENCY_DECAY_SECONDS: f64 = 604_800.0;

/// Options accepted by [`get_context`].
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub max_results: usize,
    pub min_confidence: f32,
    pub recency_weight: f64,
    pub include_superseded: bool,
    pub include_types: Option<Vec<MemoryType>>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            min_confidence: 0.5,
            recency_weight: 0.3,
            include_superseded: false,
            include_types: None,
        }
    }
}

/// A scored candidate returned by [`get_context`].
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub memory: MemoryItem,
    pub score: f64,
}

fn tokenize(text: &str) -> HashSet<String> {
    let non_alnum = Regex::new(r"[^a-z0-9\s]").expect("static regex is valid");
    let lowered = text.to_lowercase();
    let cleaned = non_alnum.replace_all(&lowered, " ");
    cleaned
        .split_whitespace()
        .filter(|tok| tok.len() >= 2)
        .map(|tok| tok.to_string())
        .collect()
}

fn text_score(context_hint: &str, item: &MemoryItem) -> f64 {
    let ctx_tokens = tokenize(context_hint);
    let mem_text = match &item.rationale {
        Some(r) => format!("{} {}", item.content, r),
        None => item.content.clone(),
    };
    let mem_tokens = tokenize(&mem_text);

    if ctx_tokens.is_empty() || mem_tokens.is_empty() {
        return 0.0;
    }

    let overlap = ctx_tokens.intersection(&mem_tokens).count() as f64;
    let cc = overlap / ctx_tokens.len() as f64;
    let mc = overlap / mem_tokens.len() as f64;
    0.7 * cc + 0.3 * mc
}

fn recency_score(item: &MemoryItem, now: chrono::DateTime<Utc>) -> f64 {
    let anchor = item.last_accessed.or(Some(item.created_at));
    let Some(anchor) = anchor else {
        return 0.5;
    };
    let seconds_ago = now.signed_duration_since(anchor).num_seconds().max(0) as f64;
    (-seconds_ago / RECENCY_DECAY_SECONDS).exp()
}

fn access_score(item: &MemoryItem, max_access_count: u64) -> f64 {
    let denom = max_access_count.max(1) as f64;
    item.access_count as f64 / denom
}

/// `get_context(session_id, context_hint, opts)`. Returns
/// up to `opts.max_results` `{memory, score}` pairs, in descending score,
/// with `score > 0`.
#[instrument(skip(adapter, store, opts), fields(session_id = %session_id))]
pub fn get_context(
    adapter: &MemoryAdapter,
    store: &OxigraphStore,
    session_id: &str,
    context_hint: &str,
    opts: &ContextOptions,
) -> Result<Vec<ScoredMemory>> {
    if context_hint.trim().is_empty() {
        return Ok(Vec::new());
    }

    let candidates = adapter.query_by_session(
        store,
        session_id,
        &QueryOptions {
            min_confidence: opts.min_confidence,
            limit: None,
            include_superseded: opts.include_superseded,
            memory_type: None,
        },
    )?;

    let candidates: Vec<MemoryItem> = match &opts.include_types {
        Some(types) => candidates
            .into_iter()
            .filter(|m| types.contains(&m.memory_type))
            .collect(),
        None => candidates,
    };

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let max_access_count = candidates.iter().map(|m| m.access_count).max().unwrap_or(0);
    let now = Utc::now();

    let rw = opts.recency_weight;
    let tw = 1.0 - ACCESS_WEIGHT - CONFIDENCE_WEIGHT - rw;

    let mut scored: Vec<ScoredMemory> = candidates
        .into_iter()
        .map(|item| {
            let text = text_score(context_hint, &item);
            let recency = recency_score(&item, now);
            let confidence = item.confidence as f64;
            let access = access_score(&item, max_access_count);
            let score = tw * text + rw * recency + CONFIDENCE_WEIGHT * confidence + ACCESS_WEIGHT * access;
            ScoredMemory { memory: item, score }
        })
        .filter(|s| s.score > 0.0)
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(opts.max_results);

    Ok(scored)
}

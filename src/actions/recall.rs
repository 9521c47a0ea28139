//! `recall` action: rank a session's memories against a context hint and
//! record access on everything returned.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::actions::ToolCallResult;
use crate::facade::MemoryFacade;
use crate::memory::ContextOptions;
use crate::types::{MemoryType, SessionId};

/// Request payload for the `recall` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct RecallRequest {
    pub context_hint: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_types: Option<Vec<MemoryType>>,
    #[serde(default)]
    pub min_confidence: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
struct RecallResult {
    id: String,
    content: String,
    memory_type: MemoryType,
    confidence: f32,
    score: f64,
}

/// Rank and return the most relevant memories for `context_hint`, then
/// best-effort record access against each returned id. `limit` is clamped
/// into `[1, 50]`.
pub async fn recall(facade: &MemoryFacade, session_id: &SessionId, request: RecallRequest) -> ToolCallResult {
    let started = Instant::now();
    let outcome = run(facade, session_id, request).await;
    let duration_ms = started.elapsed().as_millis();

    match outcome {
        Ok(results) => {
            info!(session_id = %session_id, count = results.len(), duration_ms, outcome = "ok", "recall");
            ToolCallResult::json(&results)
        }
        Err(e) => {
            info!(session_id = %session_id, duration_ms, outcome = "error", error = %e, "recall");
            ToolCallResult::from_engine_error(&e)
        }
    }
}

async fn run(
    facade: &MemoryFacade,
    session_id: &str,
    request: RecallRequest,
) -> crate::error::Result<Vec<RecallResult>> {
    let max_results = request.limit.unwrap_or(5).clamp(1, 50);

    let opts = ContextOptions {
        max_results,
        min_confidence: request.min_confidence.unwrap_or(0.5),
        include_types: request.include_types,
        ..ContextOptions::default()
    };

    let scored = facade.get_context(session_id, &request.context_hint, &opts).await?;

    for entry in &scored {
        if let Err(e) = facade.record_access(session_id, &entry.memory.id).await {
            warn!(session_id, memory_id = %entry.memory.id, error = %e, "record_access failed during recall");
        }
    }

    Ok(scored
        .into_iter()
        .map(|s| RecallResult {
            id: s.memory.id,
            content: s.memory.content,
            memory_type: s.memory.memory_type,
            confidence: s.memory.confidence,
            score: s.score,
        })
        .collect())
}

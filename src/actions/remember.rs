//! `remember` action: validate and clamp a new memory's fields, generate
//! an id if the caller omitted one, and persist it.

use std::time::Instant;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::actions::{generate_memory_id, ToolCallResult};
use crate::facade::MemoryFacade;
use crate::types::{clamp_confidence, MemoryItem, MemoryType, SourceType};

/// Request payload for the `remember` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct RememberRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    pub memory_type: MemoryType,
    pub confidence: f32,
    pub source_type: SourceType,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
}

/// Persist a new memory for `session_id`. Clamps `confidence` into
/// `[0, 1]`; content length and id/charset validation are enforced by
/// the constructor.
pub async fn remember(facade: &MemoryFacade, session_id: &str, request: RememberRequest) -> ToolCallResult {
    let started = Instant::now();
    let outcome = run(facade, session_id, request).await;
    let duration_ms = started.elapsed().as_millis();

    match outcome {
        Ok(id) => {
            info!(session_id, memory_id = %id, duration_ms, outcome = "ok", "remember");
            ToolCallResult::json(&serde_json::json!({ "id": id }))
        }
        Err(e) => {
            info!(session_id, duration_ms, outcome = "error", error = %e, "remember");
            ToolCallResult::from_engine_error(&e)
        }
    }
}

async fn run(facade: &MemoryFacade, session_id: &str, request: RememberRequest) -> crate::error::Result<String> {
    let id = request.id.unwrap_or_else(generate_memory_id);
    let confidence = clamp_confidence(request.confidence);

    let mut item = MemoryItem::new(
        id,
        request.content,
        request.memory_type,
        confidence,
        request.source_type,
        session_id,
        Utc::now(),
    )?;
    item.agent_id = request.agent_id.map(Into::into);
    item.project_id = request.project_id.map(Into::into);
    item.rationale = request.rationale;
    item.evidence_refs = request.evidence_refs;

    facade.persist(&item).await
}

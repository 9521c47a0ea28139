//! Action surface: three callable entries — `remember`, `recall`, `forget`
//! — each validating and clamping its parameters, forwarding to the memory
//! facade, and emitting a `tracing` telemetry event carrying `duration_ms`
//! and `outcome`.
//!
//! Modeled on an MCP tool-call shape (`ToolDefinition`/`ToolCallResult`):
//! this module provides the tool definitions and callable entry points
//! only. Wiring them into an actual stdio server is an external
//! orchestration layer's job.

pub mod forget;
pub mod recall;
pub mod remember;

use serde::Serialize;
use serde_json::{json, Value};

pub use forget::{forget, ForgetRequest};
pub use recall::{recall, RecallRequest};
pub use remember::{remember, RememberRequest};

/// A callable tool's JSON-schema definition, in the shape an MCP server
/// registers tools with.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The result of a tool call: either text content or an error flag, the
/// same envelope an MCP tool-call response returns to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolCallResult {
    pub fn json(value: &impl Serialize) -> Self {
        let text = serde_json::to_string_pretty(value).unwrap_or_default();
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: message.into() }],
            is_error: Some(true),
        }
    }

    /// Build an error result carrying the engine's stable error code
    /// alongside the message, the standard `{code, message}` shape an
    /// MCP-style tool-call error response returns.
    pub fn from_engine_error(err: &crate::error::EngineError) -> Self {
        let text = json!({ "code": err.code(), "message": err.to_string() }).to_string();
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: Some(true),
        }
    }
}

/// The three tool definitions this engine exposes for an external
/// MCP-server layer to register.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "remember".to_string(),
            description: "Persist a new long-term memory for the current session".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": { "type": "string", "maxLength": 2000 },
                    "memory_type": { "type": "string" },
                    "confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                    "source_type": { "type": "string" },
                    "agent_id": { "type": "string" },
                    "project_id": { "type": "string" },
                    "rationale": { "type": "string" },
                    "evidence_refs": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["content", "memory_type", "confidence", "source_type"]
            }),
        },
        ToolDefinition {
            name: "recall".to_string(),
            description: "Retrieve the most relevant memories for a context hint".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "context_hint": { "type": "string" },
                    "limit": { "type": "integer", "minimum": 1, "maximum": 50 },
                    "include_types": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["context_hint"]
            }),
        },
        ToolDefinition {
            name: "forget".to_string(),
            description: "Supersede or remove an existing memory".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "memory_id": { "type": "string" },
                    "replacement_id": { "type": "string" }
                },
                "required": ["memory_id"]
            }),
        },
    ]
}

/// Generate a fresh 24-char hex id for `remember` calls that omit one.
pub fn generate_memory_id() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_24_hex_chars() {
        let id = generate_memory_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tool_definitions_cover_the_three_actions() {
        let defs = get_tool_definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["remember", "recall", "forget"]);
    }
}

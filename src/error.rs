//! Error types for the long-term memory engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error taxonomy for the memory engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("invalid memory id: {0}")]
    InvalidMemoryId(String),

    #[error("invalid query input: {0}")]
    InvalidQueryInput(String),

    #[error("not found")]
    NotFound,

    #[error("session mismatch")]
    SessionMismatch,

    #[error("path traversal detected: {0}")]
    PathTraversalDetected(String),

    #[error("store open failed: {0}")]
    StoreOpenFailed(String),

    #[error("ontology load failed: {0}")]
    OntologyLoadFailed(String),

    #[error("operation timed out")]
    Timeout,

    #[error("store unhealthy: {0}")]
    Unhealthy(String),

    #[error("underlying triple store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether a caller may usefully retry the operation with a fresh deadline.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Timeout | EngineError::Store(_))
    }

    /// Stable error code for the action-surface boundary (mirrors the
    /// JSON-RPC-style negative codes used by MCP-shaped tool surfaces).
    pub fn code(&self) -> i64 {
        match self {
            EngineError::InvalidSessionId(_) => -32001,
            EngineError::InvalidMemoryId(_) => -32002,
            EngineError::InvalidQueryInput(_) => -32602,
            EngineError::NotFound => -32004,
            EngineError::SessionMismatch => -32003,
            EngineError::PathTraversalDetected(_) => -32005,
            EngineError::StoreOpenFailed(_) => -32006,
            EngineError::OntologyLoadFailed(_) => -32007,
            EngineError::Timeout => -32008,
            EngineError::Unhealthy(_) => -32009,
            _ => -32000,
        }
    }
}

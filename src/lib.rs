//! Long-term memory engine for an agentic coding assistant.
//!
//! A session-isolated, RDF-backed knowledge store: every session gets its
//! own on-disk triple store, seeded with a fixed ontology, and the engine
//! persists typed memories (facts, decisions, conventions, errors) against
//! it with supersession, relationship traversal, and context-ranked
//! retrieval on top.

pub mod actions;
pub mod error;
pub mod facade;
pub mod memory;
pub mod ontology;
pub mod query;
pub mod registry;
pub mod store;
pub mod types;

pub use error::{EngineError, Result};
pub use facade::MemoryFacade;
pub use types::*;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Memory adapter (C5): the operational API over a single open store.

pub mod adapter;
pub mod ranking;
pub mod stats;
pub mod traversal;

pub use adapter::{MemoryAdapter, QueryOptions};
pub use ranking::{get_context, ContextOptions, ScoredMemory};
pub use stats::{get_stats, MemoryStats};
pub use traversal::{query_related, RelatedOptions};

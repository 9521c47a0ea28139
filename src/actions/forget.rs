//! `forget` action: supersede or delete an existing memory.

use std::time::Instant;

use serde::Deserialize;
use tracing::info;

use crate::actions::ToolCallResult;
use crate::facade::MemoryFacade;

/// Request payload for the `forget` tool. When `replacement_id` is
/// present the memory is superseded by it (both must resolve in the same
/// session); otherwise the memory is deleted outright.
#[derive(Debug, Clone, Deserialize)]
pub struct ForgetRequest {
    pub memory_id: String,
    #[serde(default)]
    pub replacement_id: Option<String>,
}

/// Supersede or delete `request.memory_id` in `session_id`.
pub async fn forget(facade: &MemoryFacade, session_id: &str, request: ForgetRequest) -> ToolCallResult {
    let started = Instant::now();
    let outcome = run(facade, session_id, request).await;
    let duration_ms = started.elapsed().as_millis();

    match outcome {
        Ok(()) => {
            info!(session_id, duration_ms, outcome = "ok", "forget");
            ToolCallResult::json(&serde_json::json!({ "status": "ok" }))
        }
        Err(e) => {
            info!(session_id, duration_ms, outcome = "error", error = %e, "forget");
            ToolCallResult::from_engine_error(&e)
        }
    }
}

async fn run(facade: &MemoryFacade, session_id: &str, request: ForgetRequest) -> crate::error::Result<()> {
    match request.replacement_id {
        Some(replacement_id) => {
            // Resolving the replacement first means a dangling replacement id
            // is rejected before the original record is touched.
            facade.query_by_id(session_id, &replacement_id).await?;
            facade.supersede(session_id, &request.memory_id, Some(&replacement_id)).await
        }
        None => facade.delete(session_id, &request.memory_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::config::ManagerConfig;
    use crate::store::manager::StoreManager;
    use crate::types::{MemoryItem, MemoryType, SourceType};
    use std::time::Duration;
    use tempfile::tempdir;

    fn facade(base: std::path::PathBuf) -> MemoryFacade {
        let config = ManagerConfig {
            base_path: base,
            max_open_stores: 10,
            idle_timeout: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(3600),
            operation_timeout: Some(Duration::from_secs(5)),
        };
        MemoryFacade::new(StoreManager::new(config).unwrap())
    }

    #[tokio::test]
    async fn forget_without_replacement_deletes() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path().to_path_buf());
        let item = MemoryItem::new(
            "mem-1",
            "content",
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        )
        .unwrap();
        facade.persist(&item).await.unwrap();

        let result = forget(
            &facade,
            "alpha",
            ForgetRequest {
                memory_id: "mem-1".to_string(),
                replacement_id: None,
            },
        )
        .await;
        assert!(result.is_error.is_none());
        assert!(matches!(
            facade.query_by_id("alpha", "mem-1").await,
            Err(crate::error::EngineError::NotFound)
        ));
    }

    #[tokio::test]
    async fn forget_with_replacement_supersedes() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path().to_path_buf());
        let old = MemoryItem::new(
            "mem-1",
            "old content",
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        )
        .unwrap();
        let new = MemoryItem::new(
            "mem-2",
            "new content",
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            "2024-01-02T00:00:00Z".parse().unwrap(),
        )
        .unwrap();
        facade.persist(&old).await.unwrap();
        facade.persist(&new).await.unwrap();

        let result = forget(
            &facade,
            "alpha",
            ForgetRequest {
                memory_id: "mem-1".to_string(),
                replacement_id: Some("mem-2".to_string()),
            },
        )
        .await;
        assert!(result.is_error.is_none());

        let old_fetched = facade.query_by_id("alpha", "mem-1").await.unwrap();
        assert_eq!(old_fetched.superseded_by.as_deref(), Some("mem-2"));
    }

    #[tokio::test]
    async fn forget_rejects_dangling_replacement() {
        let dir = tempdir().unwrap();
        let facade = facade(dir.path().to_path_buf());
        let old = MemoryItem::new(
            "mem-1",
            "old content",
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        )
        .unwrap();
        facade.persist(&old).await.unwrap();

        let result = forget(
            &facade,
            "alpha",
            ForgetRequest {
                memory_id: "mem-1".to_string(),
                replacement_id: Some("mem-does-not-exist".to_string()),
            },
        )
        .await;
        assert_eq!(result.is_error, Some(true));

        let still_active = facade.query_by_id("alpha", "mem-1").await.unwrap();
        assert!(still_active.is_active());
    }
}

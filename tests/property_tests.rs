//! Property-based tests sweeping the engine's documented invariants and
//! boundary behaviors.
//!
//! Run with: cargo test --test property_tests

use std::path::PathBuf;
use std::time::Duration;

use proptest::prelude::*;

use ltm_engine::memory::RelatedOptions;
use ltm_engine::store::config::ManagerConfig;
use ltm_engine::store::manager::StoreManager;
use ltm_engine::types::{clamp_confidence, confidence_band, validate_memory_id, validate_session_id, ConfidenceBand};
use ltm_engine::types::{MemoryItem, MemoryType, RelationshipKind, SourceType};
use ltm_engine::MemoryFacade;

fn facade(base: PathBuf) -> MemoryFacade {
    let config = ManagerConfig {
        base_path: base,
        max_open_stores: 10,
        idle_timeout: Duration::from_secs(3600),
        cleanup_interval: Duration::from_secs(3600),
        operation_timeout: Some(Duration::from_secs(5)),
    };
    MemoryFacade::new(StoreManager::new(config).unwrap())
}

fn rt() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap()
}

fn seed_pair(facade: &MemoryFacade, runtime: &tokio::runtime::Runtime) {
    runtime.block_on(async {
        let a = MemoryItem::new(
            "mem-A", "content a", MemoryType::Fact, 0.9, SourceType::Tool, "s",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        ).unwrap();
        let b = MemoryItem::new(
            "mem-B", "content b", MemoryType::Fact, 0.9, SourceType::Tool, "s",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        ).unwrap();
        facade.persist(&a).await.unwrap();
        facade.persist(&b).await.unwrap();
    });
}

// ============================================================================
// §8.2 boundary behaviors
// ============================================================================

mod boundary_tests {
    use super::*;

    #[test]
    fn confidence_boundaries_bin_as_documented() {
        let cases = [
            (-0.1, ConfidenceBand::Low),
            (0.0, ConfidenceBand::Low),
            (0.5, ConfidenceBand::Medium),
            (0.799_999, ConfidenceBand::Medium),
            (0.8, ConfidenceBand::High),
            (1.0, ConfidenceBand::High),
            (1.1, ConfidenceBand::High),
        ];
        for (raw, expected) in cases {
            assert_eq!(confidence_band(clamp_confidence(raw)), expected, "raw={raw}");
        }
    }

    #[test]
    fn depth_zero_behaves_like_depth_one() {
        let dir = tempfile::tempdir().unwrap();
        let facade = facade(dir.path().to_path_buf());
        let runtime = rt();
        seed_pair(&facade, &runtime);

        runtime.block_on(async {
            let at_zero = facade
                .query_related(
                    "s",
                    "mem-A",
                    RelationshipKind::SameType,
                    &RelatedOptions { depth: 0, limit: 10, include_superseded: false },
                )
                .await
                .unwrap();
            let at_one = facade
                .query_related(
                    "s",
                    "mem-A",
                    RelationshipKind::SameType,
                    &RelatedOptions { depth: 1, limit: 10, include_superseded: false },
                )
                .await
                .unwrap();
            assert_eq!(at_zero.len(), at_one.len());
        });
    }

    #[test]
    fn depth_above_five_behaves_like_depth_five() {
        let dir = tempfile::tempdir().unwrap();
        let facade = facade(dir.path().to_path_buf());
        let runtime = rt();
        seed_pair(&facade, &runtime);

        runtime.block_on(async {
            let at_six = facade
                .query_related(
                    "s",
                    "mem-A",
                    RelationshipKind::SameType,
                    &RelatedOptions { depth: 6, limit: 10, include_superseded: false },
                )
                .await
                .unwrap();
            let at_five = facade
                .query_related(
                    "s",
                    "mem-A",
                    RelationshipKind::SameType,
                    &RelatedOptions { depth: 5, limit: 10, include_superseded: false },
                )
                .await
                .unwrap();
            assert_eq!(at_six.len(), at_five.len());
        });
    }

    #[test]
    fn content_exactly_2000_persists_2001_is_rejected() {
        let ok = MemoryItem::new(
            "mem-1",
            "x".repeat(2000),
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        );
        assert!(ok.is_ok());

        let rejected = MemoryItem::new(
            "mem-2",
            "x".repeat(2001),
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        );
        assert!(rejected.is_err());
    }

    #[test]
    fn empty_context_hint_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let facade = facade(dir.path().to_path_buf());
        let runtime = rt();
        runtime.block_on(async {
            let item = MemoryItem::new(
                "mem-1",
                "some content",
                MemoryType::Fact,
                0.9,
                SourceType::Tool,
                "alpha",
                "2024-01-01T00:00:00Z".parse().unwrap(),
            )
            .unwrap();
            facade.persist(&item).await.unwrap();

            let result = facade
                .get_context("alpha", "   ", &Default::default())
                .await
                .unwrap();
            assert!(result.is_empty());
        });
    }

    #[test]
    fn capacity_eviction_drops_exactly_the_lru_entry() {
        let dir = tempfile::tempdir().unwrap();
        let config = ManagerConfig {
            base_path: dir.path().to_path_buf(),
            max_open_stores: 2,
            idle_timeout: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(3600),
            operation_timeout: Some(Duration::from_secs(5)),
        };
        let manager = StoreManager::new(config).unwrap();
        let runtime = rt();
        runtime.block_on(async {
            manager.get_or_create("s1").await.unwrap();
            manager.get_or_create("s2").await.unwrap();
            manager.get_or_create("s3").await.unwrap();
            assert!(!manager.is_open("s1").await);
            assert!(manager.is_open("s2").await);
            assert!(manager.is_open("s3").await);
        });
    }
}

// ============================================================================
// §8.1 invariants, swept with proptest over generated ids/content/confidence.
// ============================================================================

mod invariant_tests {
    use super::*;

    fn id_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{1,32}"
    }

    fn content_strategy() -> impl Strategy<Value = String> {
        "[ -~]{1,200}"
    }

    proptest! {
        /// Invariant 8: escape safety. Content containing quote/escape
        /// characters round-trips through persist/query unaltered.
        #[test]
        fn escape_safety_round_trips(
            id in id_strategy(),
            suffix in "[\"\\\\\\n\\r\\t]{0,20}",
        ) {
            let content = format!("payload {suffix} done");
            let dir = tempfile::tempdir().unwrap();
            let facade = facade(dir.path().to_path_buf());
            let runtime = rt();
            runtime.block_on(async {
                let item = MemoryItem::new(
                    id.clone(),
                    content.clone(),
                    MemoryType::Fact,
                    0.9,
                    SourceType::Tool,
                    "alpha",
                    "2024-01-01T00:00:00Z".parse().unwrap(),
                )
                .unwrap();
                facade.persist(&item).await.unwrap();
                let fetched = facade.query_by_id("alpha", &id).await.unwrap();
                prop_assert_eq!(fetched.content, item.content);
                Ok(())
            })?;
        }

        /// Invariant 1: round-trip of record shape on every common field.
        #[test]
        fn persist_then_query_round_trips(
            id in id_strategy(),
            content in content_strategy(),
            confidence in 0.0f32..=1.0f32,
        ) {
            let dir = tempfile::tempdir().unwrap();
            let facade = facade(dir.path().to_path_buf());
            let runtime = rt();
            runtime.block_on(async {
                let item = MemoryItem::new(
                    id.clone(),
                    content.clone(),
                    MemoryType::Fact,
                    confidence,
                    SourceType::Tool,
                    "alpha",
                    "2024-01-01T00:00:00Z".parse().unwrap(),
                )
                .unwrap();
                facade.persist(&item).await.unwrap();
                let fetched = facade.query_by_id("alpha", &id).await.unwrap();
                prop_assert_eq!(fetched.id, item.id);
                prop_assert_eq!(fetched.content, item.content);
                prop_assert_eq!(fetched.memory_type, item.memory_type);
                prop_assert!((fetched.confidence - item.confidence).abs() < 1e-5);
                prop_assert_eq!(fetched.source_type, item.source_type);
                prop_assert_eq!(fetched.session_id, item.session_id);
                Ok(())
            })?;
        }

        /// Invariant 2: session isolation — a memory stored in S1 is
        /// invisible under S2 regardless of id.
        #[test]
        fn session_isolation_holds(id in id_strategy(), content in content_strategy()) {
            let dir = tempfile::tempdir().unwrap();
            let facade = facade(dir.path().to_path_buf());
            let runtime = rt();
            runtime.block_on(async {
                let item = MemoryItem::new(
                    id.clone(),
                    content,
                    MemoryType::Fact,
                    0.9,
                    SourceType::Tool,
                    "s1",
                    "2024-01-01T00:00:00Z".parse().unwrap(),
                )
                .unwrap();
                facade.persist(&item).await.unwrap();
                let seeded = facade.persist(&MemoryItem::new(
                    "seed",
                    "seed content",
                    MemoryType::Fact,
                    0.9,
                    SourceType::Tool,
                    "s2",
                    "2024-01-01T00:00:00Z".parse().unwrap(),
                ).unwrap()).await;
                prop_assert!(seeded.is_ok());
                let result = facade.query_by_id("s2", &id).await;
                prop_assert!(matches!(result, Err(ltm_engine::error::EngineError::NotFound)));
                Ok(())
            })?;
        }

        /// Invariant 4: count coherence between active and all-inclusive counts.
        #[test]
        fn count_coherence_holds(a in id_strategy(), b in id_strategy()) {
            prop_assume!(a != b);
            let dir = tempfile::tempdir().unwrap();
            let facade = facade(dir.path().to_path_buf());
            let runtime = rt();
            runtime.block_on(async {
                let m1 = MemoryItem::new(
                    a.clone(), "content one", MemoryType::Fact, 0.9, SourceType::Tool, "s",
                    "2024-01-01T00:00:00Z".parse().unwrap(),
                ).unwrap();
                let m2 = MemoryItem::new(
                    b.clone(), "content two", MemoryType::Fact, 0.9, SourceType::Tool, "s",
                    "2024-01-01T00:00:00Z".parse().unwrap(),
                ).unwrap();
                facade.persist(&m1).await.unwrap();
                facade.persist(&m2).await.unwrap();
                facade.supersede("s", &a, None).await.unwrap();

                let active = facade.count("s", false).await.unwrap();
                let all = facade.count("s", true).await.unwrap();
                prop_assert_eq!(all, active + 1);
                Ok(())
            })?;
        }

        /// Identifier charset validation never panics and rejects anything
        /// outside `[A-Za-z0-9_-]+` within the documented length bounds.
        #[test]
        fn identifier_validation_never_panics(s in ".{0,200}") {
            let _ = validate_memory_id(&s);
            let _ = validate_session_id(&s);
        }
    }
}

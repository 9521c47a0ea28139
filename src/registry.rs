//! Identifier & type registry (C1).
//!
//! Total, compile-time-determinable mappings between the engine's closed
//! tag sets and the ontology's class/individual/predicate IRIs, plus the
//! namespace used to mint per-memory, per-session, per-agent, per-project
//! IRIs. The registry is the single source of truth for these mappings;
//! no other module should hardcode an IRI fragment.

use crate::error::{EngineError, Result};
use crate::types::{ConfidenceBand, MemoryType, RelationshipKind, SourceType};

/// Canonical namespace prefix for every IRI this engine mints.
pub const NAMESPACE: &str = "https://ltm.dev/ontology#";

/// `rdf:` namespace, used by the query template layer for `rdf:type`.
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// `xsd:` namespace, used for typed literals.
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// The class `MemoryItem` belongs to (ontology loader probe target, C3).
pub const CLASS_MEMORY_ITEM: &str = "MemoryItem";

/// Map a [`MemoryType`] tag to its ontology class local name.
pub fn memory_type_class(memory_type: MemoryType) -> &'static str {
    match memory_type {
        MemoryType::Fact => "Fact",
        MemoryType::Assumption => "Assumption",
        MemoryType::Hypothesis => "Hypothesis",
        MemoryType::Discovery => "Discovery",
        MemoryType::Risk => "Risk",
        MemoryType::Unknown => "UnknownFact",
        MemoryType::Decision => "Decision",
        MemoryType::ArchitecturalDecision => "ArchitecturalDecision",
        MemoryType::ImplementationDecision => "ImplementationDecision",
        MemoryType::Alternative => "Alternative",
        MemoryType::TradeOff => "TradeOff",
        MemoryType::Convention => "Convention",
        MemoryType::CodingStandard => "CodingStandard",
        MemoryType::ArchitecturalConvention => "ArchitecturalConvention",
        MemoryType::AgentRule => "AgentRule",
        MemoryType::ProcessConvention => "ProcessConvention",
        MemoryType::Error => "Error",
        MemoryType::Bug => "Bug",
        MemoryType::Failure => "Failure",
        MemoryType::Incident => "Incident",
        MemoryType::RootCause => "RootCause",
        MemoryType::LessonLearned => "LessonLearned",
    }
}

/// Inverse of [`memory_type_class`]. Unknown class names are "not a memory
/// we own" — callers should filter these out, not treat them as fatal.
pub fn class_to_memory_type(class_local_name: &str) -> Option<MemoryType> {
    MemoryType::ALL
        .iter()
        .copied()
        .find(|t| memory_type_class(*t) == class_local_name)
}

/// Map a [`SourceType`] tag to its ontology individual local name.
pub fn source_type_individual(source_type: SourceType) -> &'static str {
    match source_type {
        SourceType::User => "UserSource",
        SourceType::Agent => "AgentSource",
        SourceType::Tool => "ToolSource",
        SourceType::ExternalDocument => "ExternalDocumentSource",
    }
}

/// Inverse of [`source_type_individual`].
pub fn individual_to_source_type(individual_local_name: &str) -> Option<SourceType> {
    SourceType::ALL
        .iter()
        .copied()
        .find(|t| source_type_individual(*t) == individual_local_name)
}

/// Map a confidence real value to its ontology individual local name
/// (forward only).
pub fn confidence_band_individual(confidence: f32) -> &'static str {
    match crate::types::confidence_band(confidence) {
        ConfidenceBand::High => "HighConfidence",
        ConfidenceBand::Medium => "MediumConfidence",
        ConfidenceBand::Low => "LowConfidence",
    }
}

/// Map a [`RelationshipKind`] to its ontology predicate local name.
pub fn relationship_predicate(kind: RelationshipKind) -> &'static str {
    match kind {
        RelationshipKind::DerivedFrom => "derivedFrom",
        RelationshipKind::SupersededBy => "supersededBy",
        RelationshipKind::Supersedes => "supersedes",
        RelationshipKind::SameType => "sameType",
        RelationshipKind::SameProject => "sameProject",
    }
}

/// Sanitize a local name before it is concatenated onto the namespace to
/// form an IRI. Identifiers are already constrained to
/// `^[A-Za-z0-9_-]+$` at the data-model boundary (types.rs); this is the
/// same re-check applied to anything else (agent ids, project ids,
/// evidence refs) that reaches IRI construction without having gone
/// through that boundary.
pub fn sanitize_local_name(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(EngineError::InvalidQueryInput(
            "IRI local name must not be empty".into(),
        ));
    }
    if !raw
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.' || b == b':')
    {
        return Err(EngineError::InvalidQueryInput(format!(
            "IRI local name '{raw}' contains characters unsafe for IRI construction"
        )));
    }
    Ok(raw.to_string())
}

/// Mint the IRI for a memory within a session.
pub fn memory_iri(memory_id: &str) -> Result<String> {
    Ok(format!("{NAMESPACE}memory_{}", sanitize_local_name(memory_id)?))
}

/// Mint the IRI for a session.
pub fn session_iri(session_id: &str) -> Result<String> {
    Ok(format!("{NAMESPACE}session_{}", sanitize_local_name(session_id)?))
}

/// Mint the IRI for an agent.
pub fn agent_iri(agent_id: &str) -> Result<String> {
    Ok(format!("{NAMESPACE}agent_{}", sanitize_local_name(agent_id)?))
}

/// Mint the IRI for a project.
pub fn project_iri(project_id: &str) -> Result<String> {
    Ok(format!("{NAMESPACE}project_{}", sanitize_local_name(project_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_type_mapping_is_total_and_injective() {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        for t in MemoryType::ALL {
            let class = memory_type_class(*t);
            assert!(seen.insert(class), "duplicate class IRI for {t:?}");
            assert_eq!(class_to_memory_type(class), Some(*t));
        }
    }

    #[test]
    fn source_type_mapping_is_total_and_injective() {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        for t in SourceType::ALL {
            let ind = source_type_individual(*t);
            assert!(seen.insert(ind));
            assert_eq!(individual_to_source_type(ind), Some(*t));
        }
    }

    #[test]
    fn unknown_class_is_not_fatal() {
        assert_eq!(class_to_memory_type("NotAClass"), None);
        assert_eq!(individual_to_source_type("NotAnIndividual"), None);
    }

    #[test]
    fn relationship_predicates_are_distinct() {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        for k in RelationshipKind::ALL {
            assert!(seen.insert(relationship_predicate(*k)));
        }
    }

    #[test]
    fn sanitize_rejects_path_traversal_chars() {
        assert!(sanitize_local_name("../escape").is_err());
        assert!(sanitize_local_name("a/b").is_err());
        assert!(sanitize_local_name("valid-id_123").is_ok());
    }

    #[test]
    fn iri_construction_round_trips() {
        let iri = memory_iri("mem-0001").unwrap();
        assert_eq!(iri, format!("{NAMESPACE}memory_mem-0001"));
    }
}

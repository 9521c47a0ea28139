//! Core data types for the long-term memory engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, Result};

/// Opaque memory identifier. Local part of a memory's IRI.
pub type MemoryId = String;

/// Opaque session identifier. Local part of a session's IRI and the key
/// into the store manager's open-stores map.
pub type SessionId = String;

/// Maximum byte length of a memory's `content` field after trimming.
pub const MAX_CONTENT_BYTES: usize = 2000;

/// Validate the shared id charset/length constraint:
/// `^[A-Za-z0-9_-]+$`, length `1..=max_len`.
pub fn validate_identifier(value: &str, max_len: usize) -> Result<()> {
    if value.is_empty() || value.len() > max_len {
        return Err(EngineError::InvalidMemoryId(format!(
            "identifier length must be 1..={max_len}, got {}",
            value.len()
        )));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(EngineError::InvalidMemoryId(format!(
            "identifier '{value}' must match ^[A-Za-z0-9_-]+$"
        )));
    }
    Ok(())
}

/// Validate a memory id (length 1..128).
pub fn validate_memory_id(id: &str) -> Result<()> {
    validate_identifier(id, 128).map_err(|_| {
        EngineError::InvalidMemoryId(format!(
            "memory id '{id}' must match ^[A-Za-z0-9_-]+$ with length 1..=128"
        ))
    })
}

/// Validate a session id (length 1..64).
pub fn validate_session_id(id: &str) -> Result<()> {
    validate_identifier(id, 64).map_err(|_| {
        EngineError::InvalidSessionId(format!(
            "session id '{id}' must match ^[A-Za-z0-9_-]+$ with length 1..=64"
        ))
    })
}

/// An opaque agent identifier. Wrapped so it cannot be confused with a
/// session id or memory id at call sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

/// An opaque project identifier, used for the `same_project` relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Closed set of memory types. Each variant maps to exactly
/// one ontology class IRI via the registry (C1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    // Knowledge
    Fact,
    Assumption,
    Hypothesis,
    Discovery,
    Risk,
    Unknown,
    // Decision
    Decision,
    ArchitecturalDecision,
    ImplementationDecision,
    Alternative,
    TradeOff,
    // Convention
    Convention,
    CodingStandard,
    ArchitecturalConvention,
    AgentRule,
    ProcessConvention,
    // Error
    Error,
    Bug,
    Failure,
    Incident,
    RootCause,
    LessonLearned,
}

impl MemoryType {
    /// All 19 closed-set tags, in declaration order. Used for totality
    /// checks and for the `same_type` statistics breakdown.
    pub const ALL: &'static [MemoryType] = &[
        MemoryType::Fact,
        MemoryType::Assumption,
        MemoryType::Hypothesis,
        MemoryType::Discovery,
        MemoryType::Risk,
        MemoryType::Unknown,
        MemoryType::Decision,
        MemoryType::ArchitecturalDecision,
        MemoryType::ImplementationDecision,
        MemoryType::Alternative,
        MemoryType::TradeOff,
        MemoryType::Convention,
        MemoryType::CodingStandard,
        MemoryType::ArchitecturalConvention,
        MemoryType::AgentRule,
        MemoryType::ProcessConvention,
        MemoryType::Error,
        MemoryType::Bug,
        MemoryType::Failure,
        MemoryType::Incident,
        MemoryType::RootCause,
        MemoryType::LessonLearned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Fact => "fact",
            MemoryType::Assumption => "assumption",
            MemoryType::Hypothesis => "hypothesis",
            MemoryType::Discovery => "discovery",
            MemoryType::Risk => "risk",
            MemoryType::Unknown => "unknown",
            MemoryType::Decision => "decision",
            MemoryType::ArchitecturalDecision => "architectural_decision",
            MemoryType::ImplementationDecision => "implementation_decision",
            MemoryType::Alternative => "alternative",
            MemoryType::TradeOff => "trade_off",
            MemoryType::Convention => "convention",
            MemoryType::CodingStandard => "coding_standard",
            MemoryType::ArchitecturalConvention => "architectural_convention",
            MemoryType::AgentRule => "agent_rule",
            MemoryType::ProcessConvention => "process_convention",
            MemoryType::Error => "error",
            MemoryType::Bug => "bug",
            MemoryType::Failure => "failure",
            MemoryType::Incident => "incident",
            MemoryType::RootCause => "root_cause",
            MemoryType::LessonLearned => "lesson_learned",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "fact" => MemoryType::Fact,
            "assumption" => MemoryType::Assumption,
            "hypothesis" => MemoryType::Hypothesis,
            "discovery" => MemoryType::Discovery,
            "risk" => MemoryType::Risk,
            "unknown" => MemoryType::Unknown,
            "decision" => MemoryType::Decision,
            "architectural_decision" => MemoryType::ArchitecturalDecision,
            "implementation_decision" => MemoryType::ImplementationDecision,
            "alternative" => MemoryType::Alternative,
            "trade_off" => MemoryType::TradeOff,
            "convention" => MemoryType::Convention,
            "coding_standard" => MemoryType::CodingStandard,
            "architectural_convention" => MemoryType::ArchitecturalConvention,
            "agent_rule" => MemoryType::AgentRule,
            "process_convention" => MemoryType::ProcessConvention,
            "error" => MemoryType::Error,
            "bug" => MemoryType::Bug,
            "failure" => MemoryType::Failure,
            "incident" => MemoryType::Incident,
            "root_cause" => MemoryType::RootCause,
            "lesson_learned" => MemoryType::LessonLearned,
            other => {
                return Err(EngineError::InvalidQueryInput(format!(
                    "unknown memory_type tag: {other}"
                )));
            }
        })
    }
}

/// Source of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    User,
    Agent,
    Tool,
    ExternalDocument,
}

impl SourceType {
    pub const ALL: &'static [SourceType] = &[
        SourceType::User,
        SourceType::Agent,
        SourceType::Tool,
        SourceType::ExternalDocument,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::User => "user",
            SourceType::Agent => "agent",
            SourceType::Tool => "tool",
            SourceType::ExternalDocument => "external_document",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "user" => SourceType::User,
            "agent" => SourceType::Agent,
            "tool" => SourceType::Tool,
            "external_document" => SourceType::ExternalDocument,
            other => {
                return Err(EngineError::InvalidQueryInput(format!(
                    "unknown source_type tag: {other}"
                )))
            }
        })
    }
}

/// Discretized confidence band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
        }
    }
}

/// Bin a clamped confidence value into a band. High >= 0.8, Medium >= 0.5,
/// else Low. Boundaries are exact, not approximate.
pub fn confidence_band(confidence: f32) -> ConfidenceBand {
    if confidence >= 0.8 {
        ConfidenceBand::High
    } else if confidence >= 0.5 {
        ConfidenceBand::Medium
    } else {
        ConfidenceBand::Low
    }
}

/// Clamp a raw confidence value into `[0.0, 1.0]`.
pub fn clamp_confidence(confidence: f32) -> f32 {
    confidence.clamp(0.0, 1.0)
}

/// The five traversable relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    DerivedFrom,
    SupersededBy,
    Supersedes,
    SameType,
    SameProject,
}

impl RelationshipKind {
    pub const ALL: &'static [RelationshipKind] = &[
        RelationshipKind::DerivedFrom,
        RelationshipKind::SupersededBy,
        RelationshipKind::Supersedes,
        RelationshipKind::SameType,
        RelationshipKind::SameProject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::DerivedFrom => "derived_from",
            RelationshipKind::SupersededBy => "superseded_by",
            RelationshipKind::Supersedes => "supersedes",
            RelationshipKind::SameType => "same_type",
            RelationshipKind::SameProject => "same_project",
        }
    }

    /// Whether `include_superseded` has any effect for this relationship
    /// (ignored for `supersedes`, since the answer set is
    /// by definition superseded items).
    pub fn respects_include_superseded(&self) -> bool {
        !matches!(self, RelationshipKind::Supersedes)
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "derived_from" => RelationshipKind::DerivedFrom,
            "superseded_by" => RelationshipKind::SupersededBy,
            "supersedes" => RelationshipKind::Supersedes,
            "same_type" => RelationshipKind::SameType,
            "same_project" => RelationshipKind::SameProject,
            other => {
                return Err(EngineError::InvalidQueryInput(format!(
                    "unknown relationship kind: {other}"
                )))
            }
        })
    }
}

/// The prefix that marks an `evidence_refs` entry as an in-store memory
/// reference rather than an opaque external identifier.
pub const EVIDENCE_MEMORY_PREFIX: &str = "mem-";

/// The core entity persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: MemoryId,
    pub content: String,
    pub memory_type: MemoryType,
    pub confidence: f32,
    pub source_type: SourceType,
    pub session_id: SessionId,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub superseded_by: Option<MemoryId>,
    #[serde(default)]
    pub superseded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl MemoryItem {
    /// Construct a new, never-superseded `MemoryItem`, validating every
    /// constraint and clamping `confidence`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        memory_type: MemoryType,
        confidence: f32,
        source_type: SourceType,
        session_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let id = id.into();
        let session_id = session_id.into();
        validate_memory_id(&id)?;
        validate_session_id(&session_id)?;

        let content = content.into();
        let trimmed = content.trim().to_string();
        if trimmed.is_empty() || trimmed.len() > MAX_CONTENT_BYTES {
            return Err(EngineError::InvalidQueryInput(format!(
                "content must be 1..={MAX_CONTENT_BYTES} bytes after trimming, got {}",
                trimmed.len()
            )));
        }

        Ok(Self {
            id,
            content: trimmed,
            memory_type,
            confidence: clamp_confidence(confidence),
            source_type,
            session_id,
            agent_id: None,
            project_id: None,
            rationale: None,
            evidence_refs: Vec::new(),
            created_at,
            superseded_by: None,
            superseded_at: None,
            access_count: 0,
            last_accessed: None,
        })
    }

    /// Whether this record is active: `superseded_at` is null.
    pub fn is_active(&self) -> bool {
        self.superseded_at.is_none()
    }

    /// Evidence refs that point at other in-store memories (prefix `mem-`).
    pub fn memory_evidence_refs(&self) -> impl Iterator<Item = &str> {
        self.evidence_refs
            .iter()
            .map(String::as_str)
            .filter(|r| r.starts_with(EVIDENCE_MEMORY_PREFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_type_round_trips_through_str() {
        for t in MemoryType::ALL {
            let s = t.as_str();
            let parsed: MemoryType = s.parse().unwrap();
            assert_eq!(*t, parsed);
        }
    }

    #[test]
    fn source_type_round_trips() {
        for t in SourceType::ALL {
            let parsed: SourceType = t.as_str().parse().unwrap();
            assert_eq!(*t, parsed);
        }
    }

    #[test]
    fn relationship_kind_round_trips() {
        for k in RelationshipKind::ALL {
            let parsed: RelationshipKind = k.as_str().parse().unwrap();
            assert_eq!(*k, parsed);
        }
    }

    #[test]
    fn unknown_memory_type_is_rejected() {
        assert!("not_a_type".parse::<MemoryType>().is_err());
    }

    #[test]
    fn confidence_band_boundaries() {
        assert_eq!(confidence_band(clamp_confidence(-0.1)), ConfidenceBand::Low);
        assert_eq!(confidence_band(0.0), ConfidenceBand::Low);
        assert_eq!(confidence_band(0.5), ConfidenceBand::Medium);
        assert_eq!(confidence_band(0.799_999), ConfidenceBand::Medium);
        assert_eq!(confidence_band(0.8), ConfidenceBand::High);
        assert_eq!(confidence_band(1.0), ConfidenceBand::High);
    }

    #[test]
    fn supersedes_ignores_include_superseded() {
        assert!(!RelationshipKind::Supersedes.respects_include_superseded());
        assert!(RelationshipKind::SameType.respects_include_superseded());
    }

    #[test]
    fn memory_id_charset_is_enforced() {
        assert!(validate_memory_id("mem-0001").is_ok());
        assert!(validate_memory_id("../escape").is_err());
        assert!(validate_memory_id("").is_err());
        assert!(validate_memory_id(&"a".repeat(129)).is_err());
    }

    #[test]
    fn session_id_charset_is_enforced() {
        assert!(validate_session_id("alpha").is_ok());
        assert!(validate_session_id("../escape").is_err());
        assert!(validate_session_id(&"a".repeat(65)).is_err());
    }

    #[test]
    fn content_length_boundary() {
        let ok = MemoryItem::new(
            "mem-1",
            "x".repeat(MAX_CONTENT_BYTES),
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            Utc::now(),
        );
        assert!(ok.is_ok());

        let too_long = MemoryItem::new(
            "mem-2",
            "x".repeat(MAX_CONTENT_BYTES + 1),
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            Utc::now(),
        );
        assert!(too_long.is_err());
    }

    #[test]
    fn confidence_is_clamped_on_ingress() {
        let m = MemoryItem::new(
            "mem-3",
            "content",
            MemoryType::Fact,
            1.5,
            SourceType::Tool,
            "alpha",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(m.confidence, 1.0);

        let m = MemoryItem::new(
            "mem-4",
            "content",
            MemoryType::Fact,
            -0.5,
            SourceType::Tool,
            "alpha",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(m.confidence, 0.0);
    }

    #[test]
    fn evidence_refs_filter_to_memory_prefixed() {
        let mut m = MemoryItem::new(
            "mem-5",
            "content",
            MemoryType::Fact,
            0.9,
            SourceType::Tool,
            "alpha",
            Utc::now(),
        )
        .unwrap();
        m.evidence_refs = vec!["mem-e1".into(), "external-doc-7".into(), "mem-e2".into()];
        let refs: Vec<&str> = m.memory_evidence_refs().collect();
        assert_eq!(refs, vec!["mem-e1", "mem-e2"]);
    }
}

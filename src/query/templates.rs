//! Query template layer (C2). Every read/write query string
//! the engine issues is produced here, from typed inputs, through the
//! escaping rules in [`crate::query::escape`]. No other module builds a
//! SPARQL string by hand.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::query::escape::{
    escape_string_literal, format_confidence, format_datetime, format_integer,
};
use crate::registry::{
    self, agent_iri, confidence_band_individual, memory_iri, memory_type_class, project_iri,
    session_iri, source_type_individual,
};
use crate::types::{MemoryItem, MemoryType, RelationshipKind};

/// Hard cap applied to every SELECT that does not carry an explicit,
/// smaller caller-supplied limit.
pub const DEFAULT_LIMIT: usize = 1000;

/// Fixed `PREFIX` block every query begins with.
pub fn prefix_block() -> String {
    format!(
        "PREFIX : <{}>\nPREFIX rdf: <{}>\nPREFIX xsd: <{}>\n",
        registry::NAMESPACE,
        registry::RDF_NS,
        registry::XSD_NS,
    )
}

fn clamp_limit(limit: Option<usize>) -> usize {
    match limit {
        Some(l) if l > 0 && l <= DEFAULT_LIMIT => l,
        Some(_) => DEFAULT_LIMIT,
        None => DEFAULT_LIMIT,
    }
}

/// Build the `INSERT DATA` query for a full memory record.
pub fn insert_memory(item: &MemoryItem) -> Result<String> {
    let iri = memory_iri(&item.id)?;
    let session = session_iri(&item.session_id)?;
    let class = memory_type_class(item.memory_type);
    let source = source_type_individual(item.source_type);
    let band = confidence_band_individual(item.confidence);
    let content = escape_string_literal(&item.content)?;
    let created_at = format_datetime(&item.created_at);

    let mut triples = String::new();
    triples.push_str(&format!("  <{iri}> rdf:type :{class} .\n"));
    triples.push_str(&format!("  <{iri}> :content {content} .\n"));
    triples.push_str(&format!(
        "  <{iri}> :confidence \"{}\"^^xsd:float .\n",
        format_confidence(item.confidence)
    ));
    triples.push_str(&format!("  <{iri}> :hasSourceType :{source} .\n"));
    triples.push_str(&format!("  <{iri}> :hasConfidenceBand :{band} .\n"));
    triples.push_str(&format!("  <{iri}> :sessionId {} .\n", escape_string_literal(&item.session_id)?));
    triples.push_str(&format!("  <{iri}> :belongsToSession <{session}> .\n"));
    triples.push_str(&format!("  <{iri}> :createdAt {created_at} .\n"));
    triples.push_str(&format!(
        "  <{iri}> :accessCount {} .\n",
        format_integer(item.access_count)
    ));

    if let Some(agent_id) = &item.agent_id {
        let agent = agent_iri(agent_id.as_ref())?;
        triples.push_str(&format!("  <{iri}> :agentId {} .\n", escape_string_literal(agent_id.as_ref())?));
        triples.push_str(&format!("  <{iri}> :authoredBy <{agent}> .\n"));
    }
    if let Some(project_id) = &item.project_id {
        let project = project_iri(project_id.as_ref())?;
        triples.push_str(&format!("  <{iri}> :projectId {} .\n", escape_string_literal(project_id.as_ref())?));
        triples.push_str(&format!("  <{iri}> :belongsToProject <{project}> .\n"));
    }
    if let Some(rationale) = &item.rationale {
        triples.push_str(&format!("  <{iri}> :rationale {} .\n", escape_string_literal(rationale)?));
    }
    if let Some(last_accessed) = &item.last_accessed {
        triples.push_str(&format!(
            "  <{iri}> :lastAccessed {} .\n",
            format_datetime(last_accessed)
        ));
    }
    if let Some(superseded_by) = &item.superseded_by {
        let target = memory_iri(superseded_by)?;
        triples.push_str(&format!("  <{iri}> :supersededBy <{target}> .\n"));
    }
    if let Some(superseded_at) = &item.superseded_at {
        triples.push_str(&format!(
            "  <{iri}> :supersededAt {} .\n",
            format_datetime(superseded_at)
        ));
    }
    for (i, entry) in item.evidence_refs.iter().enumerate() {
        let value = escape_string_literal(entry)?;
        triples.push_str(&format!("  <{iri}> :hasEvidenceEntry _:ev{i} .\n"));
        triples.push_str(&format!("  _:ev{i} :evidenceValue {value} .\n"));
        triples.push_str(&format!("  _:ev{i} :evidenceIndex {} .\n", format_integer(i as u64)));
    }

    Ok(format!("{}INSERT DATA {{\n{triples}}}", prefix_block()))
}

/// Columns shared by every record-shaped SELECT query (excludes evidence
/// refs, which are fetched with [`select_evidence_refs`] since they are
/// multi-valued and order-sensitive).
const RECORD_VARS: &str = "?m ?content ?type ?confidence ?sourceType ?sessionId ?agentId ?projectId \
?rationale ?createdAt ?supersededBy ?supersededAt ?accessCount ?lastAccessed";

fn record_where_clause() -> String {
    "  ?m rdf:type ?type .\n\
     ?m :content ?content .\n\
     ?m :confidence ?confidence .\n\
     ?m :hasSourceType ?sourceTypeNode .\n\
     ?m :sessionId ?sessionId .\n\
     BIND(STRAFTER(STR(?sourceTypeNode), \"#\") AS ?sourceType)\n\
     OPTIONAL { ?m :agentId ?agentId }\n\
     OPTIONAL { ?m :projectId ?projectId }\n\
     OPTIONAL { ?m :rationale ?rationale }\n\
     ?m :createdAt ?createdAt .\n\
     OPTIONAL { ?m :supersededBy ?supersededBy }\n\
     OPTIONAL { ?m :supersededAt ?supersededAt }\n\
     ?m :accessCount ?accessCount .\n\
     OPTIONAL { ?m :lastAccessed ?lastAccessed }\n"
        .to_string()
}

/// `query_by_session`: SELECT all active records for a
/// session, optionally filtered by a minimum confidence, ordered by
/// `created_at` descending.
pub fn query_by_session(
    session_id: &str,
    min_confidence: f32,
    limit: Option<usize>,
    include_superseded: bool,
) -> Result<String> {
    query_by_session_and_type(session_id, None, min_confidence, limit, include_superseded)
}

/// `query_by_type`: as [`query_by_session`] with an
/// additional type filter. Session-scoped, always excludes superseded.
pub fn query_by_type(session_id: &str, memory_type: MemoryType, limit: Option<usize>) -> Result<String> {
    query_by_session_and_type(session_id, Some(memory_type), 0.0, limit, false)
}

fn query_by_session_and_type(
    session_id: &str,
    memory_type: Option<MemoryType>,
    min_confidence: f32,
    limit: Option<usize>,
    include_superseded: bool,
) -> Result<String> {
    let session = escape_string_literal(session_id)?;
    let mut filters = format!(
        "  FILTER(?sessionId = {session})\n  FILTER(?confidence >= \"{}\"^^xsd:float)\n",
        format_confidence(min_confidence)
    );
    if !include_superseded {
        filters.push_str("  FILTER NOT EXISTS { ?m :supersededAt ?__any }\n");
    }
    if let Some(mt) = memory_type {
        let class = memory_type_class(mt);
        filters.push_str(&format!("  FILTER(?type = :{class})\n"));
    }
    let limit = clamp_limit(limit);
    Ok(format!(
        "{prefix}SELECT {RECORD_VARS} WHERE {{\n{where_clause}{filters}}}\nORDER BY DESC(?createdAt)\nLIMIT {limit}",
        prefix = prefix_block(),
        where_clause = record_where_clause(),
    ))
}

/// `query_by_id`: SELECT a single record by id, with no
/// session filter (the session-ownership check is applied by the caller
/// after resolution).
pub fn query_by_id(memory_id: &str) -> Result<String> {
    let iri = memory_iri(memory_id)?;
    Ok(format!(
        "{prefix}SELECT {RECORD_VARS} WHERE {{\n  BIND(<{iri}> AS ?m)\n{where_clause}}}\nLIMIT 1",
        prefix = prefix_block(),
        where_clause = record_where_clause(),
    ))
}

/// Fetch the ordered evidence refs for a resolved memory IRI.
pub fn select_evidence_refs(memory_id: &str) -> Result<String> {
    let iri = memory_iri(memory_id)?;
    Ok(format!(
        "{prefix}SELECT ?val ?idx WHERE {{\n  <{iri}> :hasEvidenceEntry ?e .\n  ?e :evidenceValue ?val .\n  ?e :evidenceIndex ?idx .\n}}\nORDER BY ASC(?idx)",
        prefix = prefix_block(),
    ))
}

/// `supersede_memory`: UPDATE setting `supersededBy` and
/// `supersededAt`. `new_id` may be `None` (superseded with no replacement).
pub fn supersede_memory(old_id: &str, new_id: Option<&str>, at: &DateTime<Utc>) -> Result<String> {
    let old_iri = memory_iri(old_id)?;
    let at_literal = format_datetime(at);
    let mut insert = format!("  <{old_iri}> :supersededAt {at_literal} .\n");
    if let Some(new_id) = new_id {
        let new_iri = memory_iri(new_id)?;
        insert.push_str(&format!("  <{old_iri}> :supersededBy <{new_iri}> .\n"));
    }
    Ok(format!(
        "{prefix}DELETE {{ <{old_iri}> :supersededBy ?b . <{old_iri}> :supersededAt ?a . }}\nINSERT {{\n{insert}}}\nWHERE {{ OPTIONAL {{ <{old_iri}> :supersededBy ?b }} OPTIONAL {{ <{old_iri}> :supersededAt ?a }} }}",
        prefix = prefix_block(),
    ))
}

/// `delete_memory`: DELETE every triple with the memory as
/// subject or object (covers evidence-entry blank nodes and incoming
/// `supersededBy`/relationship edges from other records).
pub fn delete_memory(memory_id: &str) -> Result<String> {
    let iri = memory_iri(memory_id)?;
    Ok(format!(
        "{prefix}DELETE {{ <{iri}> ?p1 ?o1 . ?e ?p2 ?o2 . ?s ?p3 <{iri}> . }}\nWHERE {{\n  OPTIONAL {{ <{iri}> ?p1 ?o1 . }}\n  OPTIONAL {{ <{iri}> :hasEvidenceEntry ?e . ?e ?p2 ?o2 . }}\n  OPTIONAL {{ ?s ?p3 <{iri}> . }}\n}}",
        prefix = prefix_block(),
    ))
}

/// `record_access`: increment `accessCount` and set
/// `lastAccessed`, via DELETE/INSERT over the current value.
pub fn record_access(memory_id: &str, at: &DateTime<Utc>) -> Result<String> {
    let iri = memory_iri(memory_id)?;
    let at_literal = format_datetime(at);
    Ok(format!(
        "{prefix}DELETE {{ <{iri}> :accessCount ?old . <{iri}> :lastAccessed ?la . }}\nINSERT {{ <{iri}> :accessCount ?incremented . <{iri}> :lastAccessed {at_literal} . }}\nWHERE {{\n  <{iri}> :accessCount ?old .\n  BIND((?old + 1) AS ?incremented)\n  OPTIONAL {{ <{iri}> :lastAccessed ?la }}\n}}",
        prefix = prefix_block(),
    ))
}

/// `count_query`: SELECT COUNT aggregate, session filter
/// required.
pub fn count_query(session_id: &str, include_superseded: bool) -> Result<String> {
    let session = escape_string_literal(session_id)?;
    let mut filters = format!("  ?m :sessionId {session} .\n");
    if !include_superseded {
        filters.push_str("  FILTER NOT EXISTS { ?m :supersededAt ?__any }\n");
    }
    Ok(format!(
        "{prefix}SELECT (COUNT(?m) AS ?count) WHERE {{\n{filters}}}",
        prefix = prefix_block(),
    ))
}

/// `query_related`: SELECT the directly-related ids
/// for one relationship kind, for a single level of traversal. The
/// adapter (C5) drives the multi-level recursion; this template only
/// produces the one-hop SELECT.
pub fn query_related(
    session_id: &str,
    start_id: &str,
    relationship: RelationshipKind,
    include_superseded: bool,
) -> Result<String> {
    let start_iri = memory_iri(start_id)?;
    let session = escape_string_literal(session_id)?;

    let body = match relationship {
        RelationshipKind::DerivedFrom => {
            format!(
                "  <{start_iri}> :hasEvidenceEntry ?e .\n  ?e :evidenceValue ?val .\n  ?e :evidenceIndex ?idx .\n  FILTER(STRSTARTS(?val, \"mem-\"))\n  BIND(IRI(CONCAT(\"{ns}memory_\", ?val)) AS ?m)\n  ?m :sessionId {session} .\n",
                ns = registry::NAMESPACE,
            )
        }
        RelationshipKind::SupersededBy => {
            format!("  <{start_iri}> :supersededBy ?m .\n  ?m :sessionId {session} .\n  BIND(0 AS ?idx)\n")
        }
        RelationshipKind::Supersedes => {
            format!("  ?m :supersededBy <{start_iri}> .\n  ?m :sessionId {session} .\n  BIND(0 AS ?idx)\n")
        }
        RelationshipKind::SameType => {
            format!(
                "  <{start_iri}> rdf:type ?startType .\n  ?m rdf:type ?startType .\n  ?m :sessionId {session} .\n  FILTER(?m != <{start_iri}>)\n  BIND(0 AS ?idx)\n"
            )
        }
        RelationshipKind::SameProject => {
            format!(
                "  <{start_iri}> :projectId ?startProject .\n  ?m :projectId ?startProject .\n  ?m :sessionId {session} .\n  FILTER(?m != <{start_iri}>)\n  BIND(0 AS ?idx)\n"
            )
        }
    };

    let superseded_filter = if relationship.respects_include_superseded() && !include_superseded {
        "  FILTER NOT EXISTS { ?m :supersededAt ?__any }\n"
    } else {
        ""
    };

    Ok(format!(
        "{prefix}SELECT ?m WHERE {{\n{body}{superseded_filter}}}\nORDER BY ASC(?idx)",
        prefix = prefix_block(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::triplestore::{OxigraphStore, TripleStore};
    use crate::types::{MemoryItem, MemoryType, SourceType};

    fn sample_item() -> MemoryItem {
        MemoryItem::new(
            "mem-0001",
            "Uses Phoenix 1.7",
            MemoryType::Fact,
            0.95,
            SourceType::Tool,
            "alpha",
            "2024-01-01T00:00:00Z".parse().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn insert_then_select_round_trips() {
        let store = OxigraphStore::open_in_memory().unwrap();
        crate::ontology::ensure_loaded(&store).unwrap();
        let item = sample_item();
        store.update(&insert_memory(&item).unwrap()).unwrap();

        let rows = store.select(&query_by_id("mem-0001").unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("content").unwrap().as_str(), "Uses Phoenix 1.7");
    }

    #[test]
    fn query_by_type_excludes_other_types() {
        let store = OxigraphStore::open_in_memory().unwrap();
        crate::ontology::ensure_loaded(&store).unwrap();
        store.update(&insert_memory(&sample_item()).unwrap()).unwrap();

        let rows = store
            .select(&query_by_type("alpha", MemoryType::Fact, None).unwrap())
            .unwrap();
        assert_eq!(rows.len(), 1);

        let rows = store
            .select(&query_by_type("alpha", MemoryType::Bug, None).unwrap())
            .unwrap();
        assert_eq!(rows.len(), 0);
    }

    #[test]
    fn record_access_increments_count() {
        let store = OxigraphStore::open_in_memory().unwrap();
        crate::ontology::ensure_loaded(&store).unwrap();
        store.update(&insert_memory(&sample_item()).unwrap()).unwrap();

        let now: DateTime<Utc> = "2024-01-02T00:00:00Z".parse().unwrap();
        store.update(&record_access("mem-0001", &now).unwrap()).unwrap();

        let rows = store.select(&query_by_id("mem-0001").unwrap()).unwrap();
        assert_eq!(rows[0].get("accessCount").unwrap().as_str(), "1");
    }

    #[test]
    fn evidence_refs_preserve_order() {
        let store = OxigraphStore::open_in_memory().unwrap();
        crate::ontology::ensure_loaded(&store).unwrap();
        let mut item = sample_item();
        item.evidence_refs = vec!["mem-e1".into(), "external-doc-7".into(), "mem-e2".into()];
        store.update(&insert_memory(&item).unwrap()).unwrap();

        let rows = store.select(&select_evidence_refs("mem-0001").unwrap()).unwrap();
        let vals: Vec<&str> = rows.iter().map(|r| r.get("val").unwrap().as_str()).collect();
        assert_eq!(vals, vec!["mem-e1", "external-doc-7", "mem-e2"]);
    }

    #[test]
    fn count_query_respects_include_superseded() {
        let store = OxigraphStore::open_in_memory().unwrap();
        crate::ontology::ensure_loaded(&store).unwrap();
        store.update(&insert_memory(&sample_item()).unwrap()).unwrap();

        let now: DateTime<Utc> = "2024-01-02T00:00:00Z".parse().unwrap();
        store.update(&supersede_memory("mem-0001", None, &now).unwrap()).unwrap();

        let rows = store.select(&count_query("alpha", false).unwrap()).unwrap();
        assert_eq!(rows[0].get("count").unwrap().as_str(), "0");

        let rows = store.select(&count_query("alpha", true).unwrap()).unwrap();
        assert_eq!(rows[0].get("count").unwrap().as_str(), "1");
    }
}

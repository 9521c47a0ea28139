//! Ontology loader (C3). Bundles the ten Turtle schema files that define the
//! memory vocabulary and loads them into a freshly opened store, idempotently
//! and in a fixed order so that class/property definitions never race with
//! each other across files.

use tracing::{debug, info};

use crate::error::Result;
use crate::store::triplestore::TripleStore;

/// Schema files in load order. `task.ttl` is last: it is supplemental
/// (diagnostics only, §9) and has no dependents among the other files.
const SCHEMA_FILES: &[(&str, &str)] = &[
    ("core.ttl", include_str!("schema/core.ttl")),
    ("knowledge.ttl", include_str!("schema/knowledge.ttl")),
    ("decision.ttl", include_str!("schema/decision.ttl")),
    ("convention.ttl", include_str!("schema/convention.ttl")),
    ("error.ttl", include_str!("schema/error.ttl")),
    ("session.ttl", include_str!("schema/session.ttl")),
    ("agent.ttl", include_str!("schema/agent.ttl")),
    ("project.ttl", include_str!("schema/project.ttl")),
    ("shapes.ttl", include_str!("schema/shapes.ttl")),
    ("task.ttl", include_str!("schema/task.ttl")),
];

/// Probe query used to decide whether the ontology is already present.
const PROBE_QUERY: &str =
    "ASK { <https://ltm.dev/ontology#MemoryItem> a <http://www.w3.org/2000/01/rdf-schema#Class> }";

/// Load the bundled ontology corpus into `store` if it isn't already
/// present. Safe to call on every store open: a populated store is detected
/// via [`PROBE_QUERY`] and the load is skipped.
pub fn ensure_loaded<S: TripleStore>(store: &S) -> Result<bool> {
    if store.ask(PROBE_QUERY)? {
        debug!("ontology already present, skipping load");
        return Ok(false);
    }
    for (name, content) in SCHEMA_FILES {
        store.load_turtle_str(content)?;
        debug!(file = name, "loaded ontology schema file");
    }
    info!(file_count = SCHEMA_FILES.len(), "ontology corpus loaded");
    Ok(true)
}

/// Force a reload of the bundled ontology corpus regardless of current
/// contents. Used by the admin CLI's `ontology reload` diagnostic command.
pub fn reload<S: TripleStore>(store: &S) -> Result<()> {
    for (name, content) in SCHEMA_FILES {
        store.load_turtle_str(content)?;
        debug!(file = name, "reloaded ontology schema file");
    }
    Ok(())
}

/// List the rdfs:Class local names currently defined in the store.
pub fn list_classes<S: TripleStore>(store: &S) -> Result<Vec<String>> {
    let rows = store.select(
        "SELECT ?c WHERE { ?c a <http://www.w3.org/2000/01/rdf-schema#Class> }",
    )?;
    Ok(rows
        .into_iter()
        .filter_map(|b| b.get("c").map(|t| local_name(t.as_str())))
        .collect())
}

/// List the named-individual local names currently defined in the store.
pub fn list_individuals<S: TripleStore>(store: &S) -> Result<Vec<String>> {
    let rows = store.select(
        "SELECT ?i WHERE { ?i a <http://www.w3.org/2002/07/owl#NamedIndividual> }",
    )?;
    Ok(rows
        .into_iter()
        .filter_map(|b| b.get("i").map(|t| local_name(t.as_str())))
        .collect())
}

/// List the rdf:Property / owl:ObjectProperty / owl:DatatypeProperty local
/// names currently defined in the store.
pub fn list_properties<S: TripleStore>(store: &S) -> Result<Vec<String>> {
    let rows = store.select(
        "SELECT DISTINCT ?p WHERE { \
            { ?p a <http://www.w3.org/1999/02/22-rdf-syntax-ns#Property> } \
            UNION { ?p a <http://www.w3.org/2002/07/owl#ObjectProperty> } \
            UNION { ?p a <http://www.w3.org/2002/07/owl#DatatypeProperty> } \
        }",
    )?;
    Ok(rows
        .into_iter()
        .filter_map(|b| b.get("p").map(|t| local_name(t.as_str())))
        .collect())
}

fn local_name(iri: &str) -> String {
    iri.rsplit(['#', '/']).next().unwrap_or(iri).to_string()
}

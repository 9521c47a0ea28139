//! Thin wrapper over the embedded `oxigraph` RDF store. No other module in
//! this crate talks to `oxigraph` directly — everything goes through
//! [`TripleStore`], so swapping the backend only ever touches this file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use oxigraph::io::RdfFormat;
use oxigraph::model::Term as OxTerm;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::error::{EngineError, Result};

/// An RDF term as returned by a SELECT query: an IRI, a typed literal, or a
/// plain (language-tagged or untyped) literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Iri(String),
    TypedLiteral { value: String, datatype: String },
    PlainLiteral(String),
}

impl Term {
    /// The lexical value of the term, regardless of kind.
    pub fn as_str(&self) -> &str {
        match self {
            Term::Iri(s) => s,
            Term::TypedLiteral { value, .. } => value,
            Term::PlainLiteral(s) => s,
        }
    }
}

/// One SELECT row: variable name -> bound term. Absent variables (never
/// bound in that row) are simply missing keys.
pub type Binding = HashMap<String, Term>;

/// Normalized health status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}

/// Opaque stats map.
pub type Stats = HashMap<String, String>;

/// Minimal API the engine consumes from the underlying triple store:
/// open, close, load_file, update, ask, select, health, stats.
pub trait TripleStore: Send + Sync {
    /// Load a schema file from disk in its declared RDF syntax.
    fn load_file(&self, path: &Path) -> Result<()>;

    /// Load RDF content already in memory (used to load the embedded
    /// ontology corpus — see `ontology::mod` for why this sits alongside
    /// `load_file` rather than requiring a temp file on disk).
    fn load_turtle_str(&self, content: &str) -> Result<()>;

    /// Execute a SPARQL Update string.
    fn update(&self, query: &str) -> Result<()>;

    /// Execute a SPARQL ASK query.
    fn ask(&self, query: &str) -> Result<bool>;

    /// Execute a SPARQL SELECT query, returning ordered bindings.
    fn select(&self, query: &str) -> Result<Vec<Binding>>;

    /// Probe the store's health.
    fn health(&self) -> Result<HealthStatus>;

    /// Opaque backend statistics.
    fn stats(&self) -> Result<Stats>;

    /// Flush and release any resources held by the store.
    fn close(&self) -> Result<()>;
}

/// `oxigraph`-backed triple store. Cheaply cloneable: `oxigraph::store::Store`
/// is internally reference-counted, so the store manager (C4) hands out
/// clones of this type rather than lock guards bounded by a lifetime.
#[derive(Clone)]
pub struct OxigraphStore {
    store: Store,
    path: Option<PathBuf>,
}

impl OxigraphStore {
    /// Open (or create) a persistent store at `path`.
    pub fn open(path: &Path, create_if_missing: bool) -> Result<Self> {
        if !path.exists() {
            if !create_if_missing {
                return Err(EngineError::StoreOpenFailed(format!(
                    "path does not exist: {}",
                    path.display()
                )));
            }
            std::fs::create_dir_all(path)?;
        }
        let store = Store::open(path).map_err(|e| EngineError::StoreOpenFailed(e.to_string()))?;
        Ok(Self {
            store,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory store (used by tests and benches).
    pub fn open_in_memory() -> Result<Self> {
        let store = Store::new().map_err(|e| EngineError::StoreOpenFailed(e.to_string()))?;
        Ok(Self { store, path: None })
    }

    /// The on-disk path this store was opened at, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn convert_term(term: &OxTerm) -> Term {
    match term {
        OxTerm::NamedNode(n) => Term::Iri(n.as_str().to_string()),
        OxTerm::BlankNode(b) => Term::Iri(format!("_:{}", b.as_str())),
        OxTerm::Literal(l) => {
            if let Some(lang) = l.language() {
                Term::PlainLiteral(format!("{}@{}", l.value(), lang))
            } else {
                Term::TypedLiteral {
                    value: l.value().to_string(),
                    datatype: l.datatype().as_str().to_string(),
                }
            }
        }
        #[allow(unreachable_patterns)]
        _ => Term::PlainLiteral(term.to_string()),
    }
}

impl TripleStore for OxigraphStore {
    fn load_file(&self, path: &Path) -> Result<()> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(RdfFormat::from_extension)
            .unwrap_or(RdfFormat::Turtle);
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        self.store
            .load_from_reader(format, reader)
            .map_err(|e| EngineError::OntologyLoadFailed(e.to_string()))?;
        Ok(())
    }

    fn load_turtle_str(&self, content: &str) -> Result<()> {
        self.store
            .load_from_reader(RdfFormat::Turtle, content.as_bytes())
            .map_err(|e| EngineError::OntologyLoadFailed(e.to_string()))?;
        Ok(())
    }

    fn update(&self, query: &str) -> Result<()> {
        self.store
            .update(query)
            .map_err(|e| EngineError::Store(e.to_string()))?;
        Ok(())
    }

    fn ask(&self, query: &str) -> Result<bool> {
        match self
            .store
            .query(query)
            .map_err(|e| EngineError::Store(e.to_string()))?
        {
            QueryResults::Boolean(b) => Ok(b),
            _ => Err(EngineError::Store(
                "expected an ASK boolean result".to_string(),
            )),
        }
    }

    fn select(&self, query: &str) -> Result<Vec<Binding>> {
        match self
            .store
            .query(query)
            .map_err(|e| EngineError::Store(e.to_string()))?
        {
            QueryResults::Solutions(solutions) => {
                let vars: Vec<String> = solutions
                    .variables()
                    .iter()
                    .map(|v| v.as_str().to_string())
                    .collect();
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution =
                        solution.map_err(|e| EngineError::Store(e.to_string()))?;
                    let mut binding = Binding::new();
                    for var in &vars {
                        if let Some(term) = solution.get(var.as_str()) {
                            binding.insert(var.clone(), convert_term(term));
                        }
                    }
                    rows.push(binding);
                }
                Ok(rows)
            }
            _ => Err(EngineError::Store(
                "expected SELECT solutions".to_string(),
            )),
        }
    }

    fn health(&self) -> Result<HealthStatus> {
        match self.store.is_empty() {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    fn stats(&self) -> Result<Stats> {
        let mut stats = Stats::new();
        let len = self
            .store
            .len()
            .map_err(|e| EngineError::Store(e.to_string()))?;
        stats.insert("quad_count".to_string(), len.to_string());
        if let Some(path) = &self.path {
            stats.insert("path".to_string(), path.display().to_string());
        }
        Ok(stats)
    }

    fn close(&self) -> Result<()> {
        self.store
            .flush()
            .map_err(|e| EngineError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_opens_and_closes() {
        let store = OxigraphStore::open_in_memory().unwrap();
        assert!(store.path().is_none());
        store.close().unwrap();
    }

    #[test]
    fn load_and_ask_round_trip() {
        let store = OxigraphStore::open_in_memory().unwrap();
        store
            .load_turtle_str(
                "@prefix : <https://ltm.dev/ontology#> . :MemoryItem a <http://www.w3.org/2000/01/rdf-schema#Class> .",
            )
            .unwrap();
        let found = store
            .ask("ASK { <https://ltm.dev/ontology#MemoryItem> a <http://www.w3.org/2000/01/rdf-schema#Class> }")
            .unwrap();
        assert!(found);
    }

    #[test]
    fn update_and_select_round_trip() {
        let store = OxigraphStore::open_in_memory().unwrap();
        store
            .update(
                "INSERT DATA { <https://ltm.dev/ontology#memory_mem-1> <https://ltm.dev/ontology#content> \"hello\" }",
            )
            .unwrap();
        let rows = store
            .select("SELECT ?c WHERE { <https://ltm.dev/ontology#memory_mem-1> <https://ltm.dev/ontology#content> ?c }")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("c").unwrap().as_str(), "hello");
    }

    #[test]
    fn stats_reports_quad_count() {
        let store = OxigraphStore::open_in_memory().unwrap();
        store
            .update("INSERT DATA { <https://ltm.dev/ontology#a> <https://ltm.dev/ontology#b> \"c\" }")
            .unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.get("quad_count").map(String::as_str), Some("1"));
    }
}

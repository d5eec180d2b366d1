// Oxigraph-backed graph store: the single touchpoint for RDF storage
// and SPARQL evaluation

use crate::error::{StoreError, StoreResult};
use crate::n3;
use crate::triple::Triple;
use oxigraph::io::RdfFormat;
use oxigraph::model::Quad;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use std::collections::{BTreeMap, BTreeSet};

/// In-memory RDF store over the default graph. Load is additive and
/// duplicate-idempotent; blank node identity is preserved for the
/// lifetime of one instance.
pub struct GraphStore {
    inner: Store,
}

/// Opaque rollback token: the full quad set at snapshot time
pub struct Snapshot {
    quads: Vec<Quad>,
}

impl GraphStore {
    pub fn new() -> StoreResult<Self> {
        let inner = Store::new()
            .map_err(|e| StoreError::Backend(format!("failed to create store: {e}")))?;
        Ok(Self { inner })
    }

    /// Load Turtle text, returning the number of triples the store grew by
    pub fn load_turtle(&self, text: &str) -> StoreResult<usize> {
        let before = self.triple_count()?;
        self.inner
            .load_from_reader(RdfFormat::Turtle, text.as_bytes())
            .map_err(|e| StoreError::parse_from_message(format!("failed to load Turtle: {e}")))?;
        let loaded = self.triple_count()? - before;
        tracing::debug!(loaded, "turtle document ingested");
        Ok(loaded)
    }

    /// Load the fact portion of an N3 document. Implication formulas are
    /// stripped first; the remainder must be valid Turtle.
    pub fn load_n3(&self, text: &str) -> StoreResult<usize> {
        let facts = n3::strip_implications(text)?;
        self.load_turtle(&facts)
    }

    /// Dump the default graph as sorted N-Triples (a deterministic
    /// Turtle subset); blank node labels are emitted as stored.
    pub fn dump_turtle(&self) -> StoreResult<String> {
        let mut lines: Vec<String> = Vec::new();
        for quad in self.inner.quads_for_pattern(None, None, None, None) {
            let quad = quad.map_err(|e| StoreError::Backend(format!("iteration failed: {e}")))?;
            lines.push(Triple::from_quad(&quad)?.lexical());
        }
        lines.sort();
        let mut out = lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        Ok(out)
    }

    /// Insert one triple; returns false when it was already present
    pub fn insert(&self, triple: &Triple) -> StoreResult<bool> {
        let quad = triple.to_quad()?;
        self.inner
            .insert(&quad)
            .map_err(|e| StoreError::Backend(format!("insert failed: {e}")))
    }

    /// Remove one triple; returns false when it was absent
    pub fn remove(&self, triple: &Triple) -> StoreResult<bool> {
        let quad = triple.to_quad()?;
        self.inner
            .remove(&quad)
            .map_err(|e| StoreError::Backend(format!("remove failed: {e}")))
    }

    pub fn triple_count(&self) -> StoreResult<usize> {
        self.inner
            .len()
            .map_err(|e| StoreError::Backend(format!("count failed: {e}")))
    }

    /// SPARQL SELECT; each row maps variable name to term lexical form.
    /// Row order is whatever the engine produces, stable for a fixed
    /// query and store state.
    pub fn select(&self, query: &str) -> StoreResult<Vec<BTreeMap<String, String>>> {
        match self.run_query(query)? {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution
                        .map_err(|e| StoreError::Query(format!("solution error: {e}")))?;
                    let mut row = BTreeMap::new();
                    for (var, term) in &solution {
                        row.insert(var.as_str().to_string(), term.to_string());
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            _ => Err(StoreError::Query(
                "expected SELECT query results".to_string(),
            )),
        }
    }

    /// SPARQL ASK
    pub fn ask(&self, query: &str) -> StoreResult<bool> {
        match self.run_query(query)? {
            QueryResults::Boolean(b) => Ok(b),
            _ => Err(StoreError::Query("expected ASK query results".to_string())),
        }
    }

    /// SPARQL CONSTRUCT; the result is a set, deduplicated and ordered
    /// by canonical lexical form
    pub fn construct(&self, query: &str) -> StoreResult<BTreeSet<Triple>> {
        match self.run_query(query)? {
            QueryResults::Graph(triples) => {
                let mut out = BTreeSet::new();
                for triple in triples {
                    let triple =
                        triple.map_err(|e| StoreError::Query(format!("triple error: {e}")))?;
                    out.insert(Triple::from_oxigraph(&triple)?);
                }
                Ok(out)
            }
            _ => Err(StoreError::Query(
                "expected CONSTRUCT query results".to_string(),
            )),
        }
    }

    /// Drop every triple
    pub fn clear(&self) -> StoreResult<()> {
        self.inner
            .clear()
            .map_err(|e| StoreError::Backend(format!("clear failed: {e}")))
    }

    /// Capture the current quad set as a rollback token
    pub fn snapshot(&self) -> StoreResult<Snapshot> {
        let mut quads = Vec::new();
        for quad in self.inner.quads_for_pattern(None, None, None, None) {
            quads.push(quad.map_err(|e| StoreError::Backend(format!("iteration failed: {e}")))?);
        }
        Ok(Snapshot { quads })
    }

    /// Restore the store to a previously captured snapshot
    pub fn restore(&self, snapshot: &Snapshot) -> StoreResult<()> {
        self.clear()?;
        for quad in &snapshot.quads {
            self.inner
                .insert(quad)
                .map_err(|e| StoreError::Backend(format!("restore failed: {e}")))?;
        }
        Ok(())
    }

    fn run_query(&self, query: &str) -> StoreResult<QueryResults> {
        self.inner
            .query(query)
            .map_err(|e| StoreError::Query(format!("SPARQL query failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triple::{Node, Object};

    const DATA: &str = r#"
        @prefix ex: <http://example.org/> .
        ex:alice ex:name "Alice" .
        ex:bob ex:name "Bob" .
        ex:alice ex:knows ex:bob .
    "#;

    #[test]
    fn test_load_turtle_counts_new_triples() {
        let store = GraphStore::new().unwrap();
        assert_eq!(store.load_turtle(DATA).unwrap(), 3);
        assert_eq!(store.triple_count().unwrap(), 3);
        // Reloading the same data is idempotent
        assert_eq!(store.load_turtle(DATA).unwrap(), 0);
        assert_eq!(store.triple_count().unwrap(), 3);
    }

    #[test]
    fn test_load_malformed_turtle_is_parse_error() {
        let store = GraphStore::new().unwrap();
        let result = store.load_turtle("ex:a ex:b \"unterminated .");
        match result {
            Err(StoreError::Parse { .. }) => {}
            other => panic!("expected Parse error, got {other:?}"),
        }
        assert_eq!(store.triple_count().unwrap(), 0);
    }

    #[test]
    fn test_ask_select_construct() {
        let store = GraphStore::new().unwrap();
        store.load_turtle(DATA).unwrap();

        assert!(store
            .ask("ASK { ?s <http://example.org/name> ?o }")
            .unwrap());
        assert!(!store
            .ask("ASK { ?s <http://example.org/absent> ?o }")
            .unwrap());

        let rows = store
            .select("SELECT ?s WHERE { ?s <http://example.org/name> ?o }")
            .unwrap();
        assert_eq!(rows.len(), 2);

        let produced = store
            .construct(
                "CONSTRUCT { ?s <http://example.org/named> ?o } \
                 WHERE { ?s <http://example.org/name> ?o }",
            )
            .unwrap();
        assert_eq!(produced.len(), 2);
    }

    #[test]
    fn test_bad_sparql_is_query_error() {
        let store = GraphStore::new().unwrap();
        let result = store.ask("ASK { ?s ?p ?o . broken }");
        assert!(matches!(result, Err(StoreError::Query(_))));
    }

    #[test]
    fn test_unknown_prefix_is_query_error() {
        let store = GraphStore::new().unwrap();
        let result = store.select("SELECT ?s WHERE { ?s nope:p ?o }");
        assert!(matches!(result, Err(StoreError::Query(_))));
    }

    #[test]
    fn test_insert_remove_idempotent() {
        let store = GraphStore::new().unwrap();
        let t = Triple::new(
            Node::iri("http://example.org/a"),
            "http://example.org/p",
            Object::literal("x"),
        );
        assert!(store.insert(&t).unwrap());
        assert!(!store.insert(&t).unwrap());
        assert_eq!(store.triple_count().unwrap(), 1);
        assert!(store.remove(&t).unwrap());
        assert!(!store.remove(&t).unwrap());
        assert_eq!(store.triple_count().unwrap(), 0);
    }

    #[test]
    fn test_snapshot_restore() {
        let store = GraphStore::new().unwrap();
        store.load_turtle(DATA).unwrap();
        let snapshot = store.snapshot().unwrap();

        let t = Triple::new(
            Node::iri("http://example.org/carol"),
            "http://example.org/name",
            Object::literal("Carol"),
        );
        store.insert(&t).unwrap();
        assert_eq!(store.triple_count().unwrap(), 4);

        store.restore(&snapshot).unwrap();
        assert_eq!(store.triple_count().unwrap(), 3);
        assert!(!store
            .ask("ASK { <http://example.org/carol> ?p ?o }")
            .unwrap());
    }

    #[test]
    fn test_dump_turtle_is_sorted_and_stable() {
        let store = GraphStore::new().unwrap();
        store.load_turtle(DATA).unwrap();
        let dump1 = store.dump_turtle().unwrap();
        let dump2 = store.dump_turtle().unwrap();
        assert_eq!(dump1, dump2);
        let lines: Vec<&str> = dump1.lines().collect();
        assert_eq!(lines.len(), 3);
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn test_dump_load_round_trip() {
        let store = GraphStore::new().unwrap();
        store.load_turtle(DATA).unwrap();
        let dump = store.dump_turtle().unwrap();

        let reloaded = GraphStore::new().unwrap();
        reloaded.load_turtle(&dump).unwrap();
        assert_eq!(reloaded.triple_count().unwrap(), 3);
        assert_eq!(reloaded.dump_turtle().unwrap(), dump);
    }

    #[test]
    fn test_load_n3_strips_implications() {
        let store = GraphStore::new().unwrap();
        let doc = concat!(
            "@prefix : <http://example.org/> .\n",
            ":a :status \"pending\" .\n",
            "{ ?t :status \"pending\" } => { ?t :status \"active\" } .\n",
        );
        assert_eq!(store.load_n3(doc).unwrap(), 1);
        assert!(store
            .ask("ASK { ?s <http://example.org/status> \"pending\" }")
            .unwrap());
    }
}

// RDF triple model with exact lexical preservation

use crate::error::{StoreError, StoreResult};
use oxigraph::model as ox;
use serde::{Deserialize, Serialize};

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// A subject or predicate position term
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Iri(String),
    Blank(String),
}

impl Node {
    pub fn iri(value: impl Into<String>) -> Self {
        Node::Iri(value.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Node::Blank(label.into())
    }

    /// N-Triples rendering
    pub fn lexical(&self) -> String {
        match self {
            Node::Iri(iri) => format!("<{iri}>"),
            Node::Blank(label) => format!("_:{label}"),
        }
    }
}

/// A typed or language-tagged literal, lexical form preserved verbatim
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LiteralValue {
    pub value: String,
    /// Datatype IRI; `None` means plain `xsd:string`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// An object position term
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Object {
    Iri(String),
    Blank(String),
    Literal(LiteralValue),
}

impl Object {
    pub fn iri(value: impl Into<String>) -> Self {
        Object::Iri(value.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Object::Blank(label.into())
    }

    /// Plain string literal
    pub fn literal(value: impl Into<String>) -> Self {
        Object::Literal(LiteralValue {
            value: value.into(),
            datatype: None,
            language: None,
        })
    }

    /// Literal with an explicit datatype IRI
    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        let datatype = if datatype == XSD_STRING {
            None
        } else {
            Some(datatype)
        };
        Object::Literal(LiteralValue {
            value: value.into(),
            datatype,
            language: None,
        })
    }

    /// Language-tagged literal
    pub fn lang_literal(value: impl Into<String>, language: impl Into<String>) -> Self {
        Object::Literal(LiteralValue {
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        })
    }

    /// N-Triples rendering
    pub fn lexical(&self) -> String {
        match self {
            Object::Iri(iri) => format!("<{iri}>"),
            Object::Blank(label) => format!("_:{label}"),
            Object::Literal(lit) => {
                let escaped = escape_literal(&lit.value);
                if let Some(lang) = &lit.language {
                    format!("\"{escaped}\"@{lang}")
                } else if let Some(dt) = &lit.datatype {
                    format!("\"{escaped}\"^^<{dt}>")
                } else {
                    format!("\"{escaped}\"")
                }
            }
        }
    }
}

/// An RDF triple in the default graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Node,
    pub predicate: String,
    pub object: Object,
}

impl Triple {
    pub fn new(subject: Node, predicate: impl Into<String>, object: Object) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }

    /// N-Triples rendering, the canonical lexical form used for sorting
    /// and hashing
    pub fn lexical(&self) -> String {
        format!(
            "{} <{}> {} .",
            self.subject.lexical(),
            self.predicate,
            self.object.lexical()
        )
    }

    /// Convert into an oxigraph quad in the default graph
    pub fn to_quad(&self) -> StoreResult<ox::Quad> {
        let subject: ox::NamedOrBlankNode = match &self.subject {
            Node::Iri(iri) => ox::NamedNode::new(iri)
                .map_err(|e| StoreError::Term(format!("invalid subject IRI '{iri}': {e}")))?
                .into(),
            Node::Blank(label) => ox::BlankNode::new(label)
                .map_err(|e| StoreError::Term(format!("invalid blank node '{label}': {e}")))?
                .into(),
        };
        let predicate = ox::NamedNode::new(&self.predicate).map_err(|e| {
            StoreError::Term(format!("invalid predicate IRI '{}': {e}", self.predicate))
        })?;
        let object: ox::Term = match &self.object {
            Object::Iri(iri) => ox::NamedNode::new(iri)
                .map_err(|e| StoreError::Term(format!("invalid object IRI '{iri}': {e}")))?
                .into(),
            Object::Blank(label) => ox::BlankNode::new(label)
                .map_err(|e| StoreError::Term(format!("invalid blank node '{label}': {e}")))?
                .into(),
            Object::Literal(lit) => literal_to_term(lit)?,
        };
        Ok(ox::Quad::new(
            subject,
            predicate,
            object,
            ox::GraphName::DefaultGraph,
        ))
    }

    /// Convert an oxigraph triple (e.g. a CONSTRUCT result) back into
    /// the store model
    pub fn from_oxigraph(triple: &ox::Triple) -> StoreResult<Self> {
        Ok(Triple {
            subject: node_from(&triple.subject),
            predicate: triple.predicate.as_str().to_string(),
            object: term_to_object(&triple.object)?,
        })
    }

    /// Convert an oxigraph quad from the default graph
    pub fn from_quad(quad: &ox::Quad) -> StoreResult<Self> {
        Ok(Triple {
            subject: node_from(&quad.subject),
            predicate: quad.predicate.as_str().to_string(),
            object: term_to_object(&quad.object)?,
        })
    }
}

fn node_from(node: &ox::NamedOrBlankNode) -> Node {
    match node {
        ox::NamedOrBlankNode::NamedNode(n) => Node::Iri(n.as_str().to_string()),
        ox::NamedOrBlankNode::BlankNode(b) => Node::Blank(b.as_str().to_string()),
    }
}

fn literal_to_term(lit: &LiteralValue) -> StoreResult<ox::Term> {
    if let Some(lang) = &lit.language {
        let literal = ox::Literal::new_language_tagged_literal(&lit.value, lang)
            .map_err(|e| StoreError::Term(format!("invalid language tag '{lang}': {e}")))?;
        return Ok(literal.into());
    }
    if let Some(dt) = &lit.datatype {
        let datatype = ox::NamedNode::new(dt)
            .map_err(|e| StoreError::Term(format!("invalid datatype IRI '{dt}': {e}")))?;
        return Ok(ox::Literal::new_typed_literal(&lit.value, datatype).into());
    }
    Ok(ox::Literal::new_simple_literal(&lit.value).into())
}

fn term_to_object(term: &ox::Term) -> StoreResult<Object> {
    match term {
        ox::Term::NamedNode(n) => Ok(Object::Iri(n.as_str().to_string())),
        ox::Term::BlankNode(b) => Ok(Object::Blank(b.as_str().to_string())),
        ox::Term::Literal(lit) => {
            let language = lit.language().map(|l| l.to_string());
            let datatype = if language.is_some() || lit.datatype().as_str() == XSD_STRING {
                None
            } else {
                Some(lit.datatype().as_str().to_string())
            };
            Ok(Object::Literal(LiteralValue {
                value: lit.value().to_string(),
                datatype,
                language,
            }))
        }
    }
}

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_iri_triple() {
        let t = Triple::new(
            Node::iri("http://example.org/a"),
            "http://example.org/p",
            Object::iri("http://example.org/b"),
        );
        assert_eq!(
            t.lexical(),
            "<http://example.org/a> <http://example.org/p> <http://example.org/b> ."
        );
    }

    #[test]
    fn test_lexical_literal_escaping() {
        let t = Triple::new(
            Node::iri("http://example.org/a"),
            "http://example.org/p",
            Object::literal("line1\nline2 \"quoted\""),
        );
        assert_eq!(
            t.lexical(),
            "<http://example.org/a> <http://example.org/p> \"line1\\nline2 \\\"quoted\\\"\" ."
        );
    }

    #[test]
    fn test_lexical_typed_and_lang_literals() {
        let typed = Object::typed_literal("42", "http://www.w3.org/2001/XMLSchema#integer");
        assert_eq!(
            typed.lexical(),
            "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
        let tagged = Object::lang_literal("chat", "fr");
        assert_eq!(tagged.lexical(), "\"chat\"@fr");
    }

    #[test]
    fn test_xsd_string_datatype_normalized() {
        // Simple literals and explicit xsd:string literals are the same term
        let plain = Object::literal("x");
        let explicit = Object::typed_literal("x", XSD_STRING);
        assert_eq!(plain, explicit);
    }

    #[test]
    fn test_quad_round_trip() {
        let t = Triple::new(
            Node::iri("http://example.org/a"),
            "http://example.org/p",
            Object::lang_literal("hello", "en"),
        );
        let quad = t.to_quad().unwrap();
        let back = Triple::from_quad(&quad).unwrap();
        assert_eq!(t, back);
    }

    #[test]
    fn test_invalid_iri_rejected() {
        let t = Triple::new(
            Node::iri("not an iri"),
            "http://example.org/p",
            Object::literal("x"),
        );
        assert!(t.to_quad().is_err());
    }

    #[test]
    fn test_ordering_is_total() {
        let mut triples = vec![
            Triple::new(
                Node::iri("http://example.org/b"),
                "http://example.org/p",
                Object::literal("2"),
            ),
            Triple::new(
                Node::iri("http://example.org/a"),
                "http://example.org/p",
                Object::literal("1"),
            ),
        ];
        triples.sort();
        assert_eq!(triples[0].subject, Node::iri("http://example.org/a"));
    }
}

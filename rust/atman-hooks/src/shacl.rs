// SHACL subset validation: node shapes targeted by class, with
// cardinality, datatype, class and node-kind property constraints

use crate::error::HooksResult;
use crate::view::StoreView;
use atman_store::GraphStore;
use serde::{Deserialize, Serialize};

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// One constraint violation found during validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaclViolation {
    pub focus: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub constraint: String,
    pub message: String,
}

/// Validation outcome; `conforms` is true when no violations were found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub conforms: bool,
    pub violations: Vec<ShaclViolation>,
}

#[derive(Debug)]
struct PropertyConstraint {
    path: String,
    min_count: Option<u64>,
    max_count: Option<u64>,
    datatype: Option<String>,
    class: Option<String>,
    node_kind: Option<String>,
}

/// Validate the data view against a shapes graph given as Turtle.
/// Supported subset: `sh:NodeShape` with `sh:targetClass` and
/// `sh:property` shapes carrying `sh:path`, `sh:minCount`,
/// `sh:maxCount`, `sh:datatype`, `sh:class` and `sh:nodeKind`.
pub fn validate_shapes(data: &StoreView, shapes_turtle: &str) -> HooksResult<ValidationReport> {
    let shapes = GraphStore::new()?;
    shapes.load_turtle(shapes_turtle)?;

    let mut violations = Vec::new();

    let shape_rows = shapes.select(
        "PREFIX sh: <http://www.w3.org/ns/shacl#> \
         SELECT ?shape ?target WHERE { \
           ?shape a sh:NodeShape ; sh:targetClass ?target \
         }",
    )?;

    for shape_row in &shape_rows {
        let (Some(shape), Some(target)) = (shape_row.get("shape"), shape_row.get("target")) else {
            continue;
        };
        let Some(target_iri) = strip_iri(target) else {
            continue;
        };

        let constraints = property_constraints(&shapes, shape)?;
        let focus_rows = data.select(&format!(
            "SELECT ?focus WHERE {{ ?focus a <{target_iri}> }}"
        ))?;

        for focus_row in &focus_rows {
            let Some(focus) = focus_row.get("focus") else {
                continue;
            };
            let Some(focus_iri) = strip_iri(focus) else {
                continue;
            };
            for constraint in &constraints {
                check_property(data, focus_iri, constraint, &mut violations)?;
            }
        }
    }

    Ok(ValidationReport {
        conforms: violations.is_empty(),
        violations,
    })
}

fn property_constraints(
    shapes: &GraphStore,
    shape_term: &str,
) -> HooksResult<Vec<PropertyConstraint>> {
    let Some(shape_iri) = strip_iri(shape_term) else {
        return Ok(Vec::new());
    };
    let rows = shapes.select(&format!(
        "PREFIX sh: <http://www.w3.org/ns/shacl#> \
         SELECT ?path ?minCount ?maxCount ?datatype ?class ?nodeKind WHERE {{ \
           <{shape_iri}> sh:property ?prop . \
           ?prop sh:path ?path . \
           OPTIONAL {{ ?prop sh:minCount ?minCount }} \
           OPTIONAL {{ ?prop sh:maxCount ?maxCount }} \
           OPTIONAL {{ ?prop sh:datatype ?datatype }} \
           OPTIONAL {{ ?prop sh:class ?class }} \
           OPTIONAL {{ ?prop sh:nodeKind ?nodeKind }} \
         }}"
    ))?;

    let mut constraints = Vec::new();
    for row in &rows {
        let Some(path) = row.get("path").and_then(|p| strip_iri(p)) else {
            continue;
        };
        constraints.push(PropertyConstraint {
            path: path.to_string(),
            min_count: row.get("minCount").and_then(|v| parse_count(v)),
            max_count: row.get("maxCount").and_then(|v| parse_count(v)),
            datatype: row
                .get("datatype")
                .and_then(|v| strip_iri(v))
                .map(str::to_string),
            class: row
                .get("class")
                .and_then(|v| strip_iri(v))
                .map(str::to_string),
            node_kind: row
                .get("nodeKind")
                .and_then(|v| strip_iri(v))
                .map(str::to_string),
        });
    }
    Ok(constraints)
}

fn check_property(
    data: &StoreView,
    focus: &str,
    constraint: &PropertyConstraint,
    violations: &mut Vec<ShaclViolation>,
) -> HooksResult<()> {
    let rows = data.select(&format!(
        "SELECT ?v WHERE {{ <{focus}> <{}> ?v }}",
        constraint.path
    ))?;
    let values: Vec<&String> = rows.iter().filter_map(|r| r.get("v")).collect();
    let count = values.len() as u64;

    if let Some(min) = constraint.min_count {
        if count < min {
            violations.push(violation(
                focus,
                &constraint.path,
                "sh:minCount",
                format!("expected at least {min} value(s), found {count}"),
            ));
        }
    }
    if let Some(max) = constraint.max_count {
        if count > max {
            violations.push(violation(
                focus,
                &constraint.path,
                "sh:maxCount",
                format!("expected at most {max} value(s), found {count}"),
            ));
        }
    }
    if let Some(datatype) = &constraint.datatype {
        for value in &values {
            if !literal_has_datatype(value, datatype) {
                violations.push(violation(
                    focus,
                    &constraint.path,
                    "sh:datatype",
                    format!("value does not have datatype <{datatype}>"),
                ));
            }
        }
    }
    if let Some(class) = &constraint.class {
        for value in &values {
            let conforms = match strip_iri(value) {
                Some(iri) => data.ask(&format!("ASK {{ <{iri}> a <{class}> }}"))?,
                None => false,
            };
            if !conforms {
                violations.push(violation(
                    focus,
                    &constraint.path,
                    "sh:class",
                    format!("value is not an instance of <{class}>"),
                ));
            }
        }
    }
    if let Some(node_kind) = &constraint.node_kind {
        for value in &values {
            if !matches_node_kind(value, node_kind) {
                violations.push(violation(
                    focus,
                    &constraint.path,
                    "sh:nodeKind",
                    format!("value is not of node kind <{node_kind}>"),
                ));
            }
        }
    }
    Ok(())
}

fn violation(focus: &str, path: &str, constraint: &str, message: String) -> ShaclViolation {
    ShaclViolation {
        focus: focus.to_string(),
        path: Some(path.to_string()),
        constraint: constraint.to_string(),
        message,
    }
}

/// `<iri>` term rendering to its bare IRI
fn strip_iri(term: &str) -> Option<&str> {
    term.strip_prefix('<').and_then(|t| t.strip_suffix('>'))
}

fn parse_count(term: &str) -> Option<u64> {
    let lexical = if let Some(rest) = term.strip_prefix('"') {
        rest.split('"').next()?
    } else {
        term
    };
    lexical.parse().ok()
}

/// Inspect the N-Triples rendering of a term against a datatype IRI
fn literal_has_datatype(term: &str, datatype: &str) -> bool {
    if !term.starts_with('"') {
        return false;
    }
    match term.rsplit_once("^^") {
        Some((_, suffix)) => strip_iri(suffix.trim()) == Some(datatype),
        // Plain literal: xsd:string unless language-tagged
        None => datatype == XSD_STRING && !term.contains("\"@"),
    }
}

fn matches_node_kind(term: &str, node_kind: &str) -> bool {
    match node_kind {
        "http://www.w3.org/ns/shacl#IRI" => term.starts_with('<'),
        "http://www.w3.org/ns/shacl#Literal" => term.starts_with('"'),
        "http://www.w3.org/ns/shacl#BlankNode" => term.starts_with("_:"),
        _ => false,
    }
}

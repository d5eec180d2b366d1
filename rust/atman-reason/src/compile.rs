// N3 implication compiler: reduces `{ body } => { head }` to SPARQL
// CONSTRUCT, rejecting rules whose head binds fresh variables

use crate::error::ReasonResult;
use atman_store::n3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One implication compiled to an executable SPARQL CONSTRUCT query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRule {
    /// `rule-<n>`, numbered in source order
    pub id: String,
    /// Byte span of the implication in the source document
    pub source_span: (usize, usize),
    /// `CONSTRUCT { head } WHERE { body }` with prefix declarations
    pub sparql: String,
    /// Prefixes in scope at compile time
    pub prefixes: BTreeMap<String, String>,
    /// Variables shared between body and head
    pub variables: BTreeSet<String>,
}

/// A rule the compiler refused, with the reason it was omitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRule {
    pub id: String,
    pub source_span: (usize, usize),
    pub reason: String,
}

/// Compilation output: accepted rules in source order plus the rules
/// omitted from the set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub rules: Vec<CompiledRule>,
    pub rejected: Vec<RejectedRule>,
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Compile every implication in an N3 document. Two parses of the same
/// input produce byte-identical SPARQL.
pub fn compile_rules(text: &str) -> ReasonResult<RuleSet> {
    let (_, implications) = n3::split_document(text)?;
    let prefixes = parse_prefixes(text);
    let mut set = RuleSet::default();

    for (index, implication) in implications.iter().enumerate() {
        let id = format!("rule-{}", index + 1);
        let body_vars = extract_variables(&implication.body);
        let head_vars = extract_variables(&implication.head);

        if let Some(unbound) = head_vars.difference(&body_vars).next() {
            tracing::warn!(rule = %id, variable = %unbound, "unsafe rule omitted from compiled set");
            set.rejected.push(RejectedRule {
                id,
                source_span: implication.span,
                reason: format!("head variable ?{unbound} is not bound in the body"),
            });
            continue;
        }

        let mut sparql = String::new();
        for (prefix, iri) in &prefixes {
            sparql.push_str(&format!("PREFIX {prefix}: <{iri}>\n"));
        }
        sparql.push_str(&format!(
            "CONSTRUCT {{ {} }}\nWHERE {{ {} }}",
            normalize_pattern(&implication.head),
            normalize_pattern(&implication.body)
        ));

        set.rules.push(CompiledRule {
            id,
            source_span: implication.span,
            sparql,
            prefixes: prefixes.clone(),
            variables: body_vars.intersection(&head_vars).cloned().collect(),
        });
    }

    Ok(set)
}

/// Collect `@prefix` / `PREFIX` declarations; later declarations win
fn parse_prefixes(text: &str) -> BTreeMap<String, String> {
    let mut prefixes = BTreeMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        let rest = if let Some(rest) = trimmed.strip_prefix("@prefix") {
            rest
        } else if let Some(rest) = trimmed
            .strip_prefix("PREFIX")
            .or_else(|| trimmed.strip_prefix("prefix"))
        {
            rest
        } else {
            continue;
        };
        let rest = rest.trim();
        let Some(colon) = rest.find(':') else {
            continue;
        };
        let name = rest[..colon].trim().to_string();
        let rest = rest[colon + 1..].trim();
        let Some(open) = rest.find('<') else {
            continue;
        };
        let Some(close) = rest.find('>') else {
            continue;
        };
        if close > open {
            prefixes.insert(name, rest[open + 1..close].to_string());
        }
    }
    prefixes
}

/// Variables (`?name`) in a graph pattern, skipping quoted literals
/// and IRI references
fn extract_variables(pattern: &str) -> BTreeSet<String> {
    let bytes = pattern.as_bytes();
    let mut vars = BTreeSet::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\\' {
                        i += 2;
                        continue;
                    }
                    if bytes[i] == quote {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            b'<' => {
                while i < bytes.len() && bytes[i] != b'>' {
                    i += 1;
                }
                i += 1;
            }
            b'?' | b'$' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                if end > start {
                    vars.insert(pattern[start..end].to_string());
                }
                i = end;
            }
            _ => i += 1,
        }
    }
    vars
}

/// Collapse internal whitespace so identical patterns compile to
/// identical bytes regardless of source layout. Whitespace inside
/// quoted literals is preserved.
fn normalize_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut pending_space = false;
    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                pending_space = !out.is_empty();
            }
            '"' | '\'' => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                out.push(c);
                while let Some(inner) = chars.next() {
                    out.push(inner);
                    if inner == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                        continue;
                    }
                    if inner == c {
                        break;
                    }
                }
            }
            _ => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                out.push(c);
            }
        }
    }
    out
}

// N3 document splitting: separates `{ body } => { head }` implications
// from plain facts so each side can be handled by the right consumer

use crate::error::{StoreError, StoreResult};

/// One implication extracted from an N3 document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Implication {
    /// Antecedent triples, raw text between the first brace pair
    pub body: String,
    /// Consequent triples, raw text between the second brace pair
    pub head: String,
    /// Byte span of the whole implication in the source document
    pub span: (usize, usize),
}

/// Split an N3 document into its fact-only remainder and the list of
/// implications, in source order. Prefix directives stay in the
/// remainder. Braces inside string literals and IRIs do not count.
pub fn split_document(text: &str) -> StoreResult<(String, Vec<Implication>)> {
    let bytes = text.as_bytes();
    let mut implications = Vec::new();
    let mut facts = String::with_capacity(text.len());
    let mut cursor = 0;

    while cursor < bytes.len() {
        match next_significant(bytes, cursor) {
            Some(start) if bytes[start] == b'{' => {
                let body_end = match_brace(text, start)?;
                let after_body = skip_insignificant(bytes, body_end + 1);
                if after_body + 1 < bytes.len() && &bytes[after_body..after_body + 2] == b"=>" {
                    let head_start = skip_insignificant(bytes, after_body + 2);
                    if head_start >= bytes.len() || bytes[head_start] != b'{' {
                        return Err(StoreError::parse_from_message(format!(
                            "implication at byte {start} has no braced consequent"
                        )));
                    }
                    let head_end = match_brace(text, head_start)?;
                    // Consume an optional trailing statement terminator
                    let mut end = skip_insignificant(bytes, head_end + 1);
                    if end < bytes.len() && bytes[end] == b'.' {
                        end += 1;
                    } else {
                        end = head_end + 1;
                    }
                    facts.push_str(&text[cursor..start]);
                    implications.push(Implication {
                        body: text[start + 1..body_end].trim().to_string(),
                        head: text[head_start + 1..head_end].trim().to_string(),
                        span: (start, end),
                    });
                    cursor = end;
                } else {
                    // A braced formula that is not an implication is not
                    // something the fact loader can consume
                    return Err(StoreError::parse_from_message(format!(
                        "unsupported N3 formula at byte {start}"
                    )));
                }
            }
            Some(stop) => {
                // Copy through the next token and keep scanning
                let next = advance_token(text, stop)?;
                facts.push_str(&text[cursor..next]);
                cursor = next;
            }
            None => {
                facts.push_str(&text[cursor..]);
                break;
            }
        }
    }

    Ok((facts, implications))
}

/// Strip implications, returning only the fact portion of a document
pub fn strip_implications(text: &str) -> StoreResult<String> {
    split_document(text).map(|(facts, _)| facts)
}

/// Find the next position that starts either a brace group or a token
/// that must be skipped atomically (string literal, IRI, comment).
fn next_significant(bytes: &[u8], mut pos: usize) -> Option<usize> {
    while pos < bytes.len() {
        match bytes[pos] {
            b'{' | b'"' | b'\'' | b'<' | b'#' => return Some(pos),
            _ => pos += 1,
        }
    }
    None
}

/// Advance past one atomic token starting at `pos` (string, IRI or
/// comment), returning the position just after it.
fn advance_token(text: &str, pos: usize) -> StoreResult<usize> {
    let bytes = text.as_bytes();
    match bytes[pos] {
        b'"' | b'\'' => skip_string(text, pos),
        b'<' => {
            let mut i = pos + 1;
            while i < bytes.len() && bytes[i] != b'>' {
                i += 1;
            }
            if i >= bytes.len() {
                return Err(StoreError::parse_from_message(format!(
                    "unterminated IRI starting at byte {pos}"
                )));
            }
            Ok(i + 1)
        }
        b'#' => {
            let mut i = pos;
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            Ok(i)
        }
        _ => Ok(pos + 1),
    }
}

/// Skip whitespace and comments, returning the next significant byte
fn skip_insignificant(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() {
        match bytes[pos] {
            b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
            b'#' => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            _ => break,
        }
    }
    pos
}

/// Find the matching close brace for the open brace at `open`,
/// quote- and IRI-aware.
fn match_brace(text: &str, open: usize) -> StoreResult<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut pos = open;
    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => {
                depth += 1;
                pos += 1;
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(pos);
                }
                pos += 1;
            }
            b'"' | b'\'' => pos = skip_string(text, pos)?,
            b'<' => {
                while pos < bytes.len() && bytes[pos] != b'>' {
                    pos += 1;
                }
                pos += 1;
            }
            b'#' => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            _ => pos += 1,
        }
    }
    Err(StoreError::parse_from_message(format!(
        "unbalanced brace opened at byte {open}"
    )))
}

/// Skip a quoted literal starting at `pos`, handling escapes and both
/// short and long (triple-quoted) forms.
fn skip_string(text: &str, pos: usize) -> StoreResult<usize> {
    let bytes = text.as_bytes();
    let quote = bytes[pos];
    let long = pos + 2 < bytes.len() && bytes[pos + 1] == quote && bytes[pos + 2] == quote;
    let (delim_len, mut i) = if long { (3, pos + 3) } else { (1, pos + 1) };
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            if delim_len == 1 {
                return Ok(i + 1);
            }
            if i + 2 < bytes.len() && bytes[i + 1] == quote && bytes[i + 2] == quote {
                return Ok(i + 3);
            }
        }
        i += 1;
    }
    Err(StoreError::parse_from_message(format!(
        "unterminated string literal starting at byte {pos}"
    )))
}

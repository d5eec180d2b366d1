// Error types for store operations

use thiserror::Error;

/// Error types for store operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("parse error at line {line} column {column}: {reason}")]
    Parse {
        line: u64,
        column: u64,
        reason: String,
    },
    #[error("query failed: {0}")]
    Query(String),
    #[error("store backend failed: {0}")]
    Backend(String),
    #[error("invalid RDF term: {0}")]
    Term(String),
    #[error("topology violation: delta of {size} triples exceeds batch limit {limit}")]
    TopologyViolation { size: usize, limit: usize },
}

impl StoreError {
    /// Build a `Parse` error from a backend message, extracting the
    /// line/column position when the message carries one.
    pub fn parse_from_message(message: impl Into<String>) -> Self {
        let reason = message.into();
        let line = number_after(&reason, "line");
        let column = number_after(&reason, "column");
        StoreError::Parse {
            line,
            column,
            reason,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Scan `text` for the first integer following the word `marker`.
/// Returns 0 when no position information is present.
fn number_after(text: &str, marker: &str) -> u64 {
    let lower = text.to_ascii_lowercase();
    let mut rest = lower.as_str();
    while let Some(idx) = rest.find(marker) {
        let tail = &rest[idx + marker.len()..];
        let tail = tail.trim_start_matches([' ', ':', '=']);
        let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            if let Ok(n) = digits.parse() {
                return n;
            }
        }
        rest = &rest[idx + marker.len()..];
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_position_extraction() {
        let err = StoreError::parse_from_message("syntax error at line 12 column 7: bad token");
        match err {
            StoreError::Parse { line, column, .. } => {
                assert_eq!(line, 12);
                assert_eq!(column, 7);
            }
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_without_position() {
        let err = StoreError::parse_from_message("unterminated literal");
        match err {
            StoreError::Parse { line, column, reason } => {
                assert_eq!(line, 0);
                assert_eq!(column, 0);
                assert_eq!(reason, "unterminated literal");
            }
            other => panic!("expected Parse error, got {other:?}"),
        }
    }
}

// Error sanitizer: the only bridge from raw platform errors to
// receipts and hook results. Strips paths, stack frames and
// secret-looking material before an error crosses a boundary.

use serde::{Deserialize, Serialize};

/// Stable error kind identifiers used across receipts
pub mod kind {
    pub const TOPOLOGY_VIOLATION: &str = "TopologyViolation";
    pub const EMPTY_DELTA: &str = "EmptyDelta";
    pub const PARSE_ERROR: &str = "ParseError";
    pub const UNSAFE_RULE: &str = "UnsafeRuleError";
    pub const QUERY_ERROR: &str = "QueryError";
    pub const GUARD_VIOLATION: &str = "GuardViolation";
    pub const HOOK_TIMEOUT: &str = "HookTimeout";
    pub const SANDBOX_BREACH: &str = "SandboxBreach";
    pub const POST_HOOK_ERROR: &str = "PostHookError";
    pub const STORE_ERROR: &str = "StoreError";
    pub const CONVERGENCE_ERROR: &str = "ConvergenceError";
    pub const TRANSACTION_TIMEOUT: &str = "TransactionTimeout";
    pub const HOOK_PANIC: &str = "HookPanic";
    pub const HOOK_FAILED: &str = "HookFailed";
    pub const TIMEOUT: &str = "Timeout";
}

const MAX_REASON_LEN: usize = 200;
const SECRET_KEY_MARKERS: [&str; 5] = ["secret", "token", "password", "credential", "key"];

/// An error reduced to what may safely cross a component boundary:
/// a stable kind, a scrubbed one-line reason, and the hook it came
/// from when applicable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedError {
    pub kind: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_id: Option<String>,
}

impl SanitizedError {
    pub fn new(kind: &str, raw_message: &str) -> Self {
        Self {
            kind: kind.to_string(),
            reason: sanitize_message(raw_message),
            hook_id: None,
        }
    }

    pub fn for_hook(kind: &str, raw_message: &str, hook_id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            reason: sanitize_message(raw_message),
            hook_id: Some(hook_id.to_string()),
        }
    }
}

impl std::fmt::Display for SanitizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.hook_id {
            Some(id) => write!(f, "{} ({}): {}", self.kind, id, self.reason),
            None => write!(f, "{}: {}", self.kind, self.reason),
        }
    }
}

/// Scrub a raw error message: keep the first line only (stack frames
/// dropped), replace filesystem paths with `<path>`, redact values of
/// secret-looking keys and long high-entropy runs, and cap the length.
pub fn sanitize_message(raw: &str) -> String {
    let first_line = raw.lines().next().unwrap_or("");
    let mut out = Vec::new();
    for token in first_line.split_whitespace() {
        out.push(scrub_token(token));
    }
    let mut joined = out.join(" ");
    if joined.len() > MAX_REASON_LEN {
        let mut cut = MAX_REASON_LEN;
        while !joined.is_char_boundary(cut) {
            cut -= 1;
        }
        joined.truncate(cut);
    }
    joined
}

fn scrub_token(token: &str) -> String {
    // key=value pairs with a secret-looking key keep the key only
    if let Some(eq) = token.find('=') {
        let key = &token[..eq];
        let lower = key.to_ascii_lowercase();
        if SECRET_KEY_MARKERS.iter().any(|m| lower.contains(m)) {
            return format!("{key}=<redacted>");
        }
    }
    if looks_like_path(token) {
        return "<path>".to_string();
    }
    if looks_high_entropy(token) {
        return "<redacted>".to_string();
    }
    token.to_string()
}

fn looks_like_path(token: &str) -> bool {
    let trimmed = token.trim_matches(|c: char| matches!(c, '"' | '\'' | '(' | ')' | ',' | ':'));
    if trimmed.starts_with('/') && trimmed[1..].contains('/') {
        return true;
    }
    // Windows drive form, e.g. C:\Users\...
    let bytes = trimmed.as_bytes();
    bytes.len() > 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

fn looks_high_entropy(token: &str) -> bool {
    let trimmed = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    if trimmed.len() < 32 {
        return false;
    }
    let hexish = trimmed.chars().all(|c| c.is_ascii_hexdigit());
    let base64ish = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/');
    let has_digit = trimmed.chars().any(|c| c.is_ascii_digit());
    hexish || (base64ish && has_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_stripped() {
        let scrubbed = sanitize_message("failed to open /home/user/.config/creds.toml for reading");
        assert!(!scrubbed.contains("/home"));
        assert!(scrubbed.contains("<path>"));
        assert!(scrubbed.contains("failed to open"));
    }

    #[test]
    fn test_windows_paths_are_stripped() {
        let scrubbed = sanitize_message("cannot read C:\\Users\\admin\\secrets.txt");
        assert!(!scrubbed.contains("Users"));
        assert!(scrubbed.contains("<path>"));
    }

    #[test]
    fn test_stack_frames_dropped() {
        let raw = "boom happened\n  at frame one\n  at frame two";
        let scrubbed = sanitize_message(raw);
        assert_eq!(scrubbed, "boom happened");
    }

    #[test]
    fn test_secret_assignments_redacted() {
        let scrubbed = sanitize_message("request failed: API_TOKEN=abc123 rejected");
        assert!(!scrubbed.contains("abc123"));
        assert!(scrubbed.contains("API_TOKEN=<redacted>"));
    }

    #[test]
    fn test_long_hex_runs_redacted() {
        let raw = "bad digest deadbeefdeadbeefdeadbeefdeadbeefdeadbeef observed";
        let scrubbed = sanitize_message(raw);
        assert!(!scrubbed.contains("deadbeefdead"));
        assert!(scrubbed.contains("<redacted>"));
    }

    #[test]
    fn test_short_words_survive() {
        let scrubbed = sanitize_message("store rejected the delta");
        assert_eq!(scrubbed, "store rejected the delta");
    }

    #[test]
    fn test_reason_length_capped() {
        let raw = "x".repeat(500);
        assert!(sanitize_message(&raw).len() <= MAX_REASON_LEN);
    }

    #[test]
    fn test_display_includes_hook_id() {
        let err = SanitizedError::for_hook(kind::GUARD_VIOLATION, "denied", "protect-system");
        assert_eq!(err.to_string(), "GuardViolation (protect-system): denied");
    }
}

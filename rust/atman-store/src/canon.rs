// Canonical forms and content hashes for triple sets

use crate::error::StoreResult;
use crate::store::GraphStore;
use crate::triple::Triple;
use sha2::{Digest, Sha256};

/// Canonical form of a triple list: lexical renderings, sorted,
/// newline-joined. Deterministic for any input order.
pub fn canonical_form(triples: &[Triple]) -> String {
    let mut lines: Vec<String> = triples.iter().map(Triple::lexical).collect();
    lines.sort();
    lines.dedup();
    lines.join("\n")
}

/// SHA-256 of the canonical form, lowercase hex
pub fn canonical_hash(triples: &[Triple]) -> String {
    sha256_hex(canonical_form(triples).as_bytes())
}

/// SHA-256 over raw bytes, lowercase hex
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Blake3 over raw bytes, lowercase hex; used for content-addressed
/// cache keys where chain compatibility is not required
pub fn blake3_hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Whether two stores hold the same graph, compared by canonical dump.
/// Blank node labels are compared as stored; callers that relabel
/// across dump/load cycles must keep labels stable for this check.
pub fn isomorphic(a: &GraphStore, b: &GraphStore) -> StoreResult<bool> {
    Ok(a.dump_turtle()? == b.dump_turtle()?)
}

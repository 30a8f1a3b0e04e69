//! Cache keys: BLAKE3 fingerprint of (document bytes, instruction text).
//!
//! Each component is hashed on its own and the two digests are hashed
//! together, so the key has a fixed 64-hex-digit length and no pair of
//! inputs can collide by shifting bytes across the boundary between
//! document and instruction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of one extraction request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for `bytes` extracted with `instruction`.
pub fn fingerprint(bytes: &[u8], instruction: &str) -> Fingerprint {
    let document = blake3::hash(bytes);
    let prompt = blake3::hash(instruction.as_bytes());

    let mut hasher = blake3::Hasher::new();
    hasher.update(document.as_bytes());
    hasher.update(prompt.as_bytes());
    Fingerprint(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = fingerprint(b"marksheet", "extract");
        let b = fingerprint(b"marksheet", "extract");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn changes_with_document_bytes() {
        assert_ne!(
            fingerprint(b"marksheet-a", "extract"),
            fingerprint(b"marksheet-b", "extract")
        );
    }

    #[test]
    fn changes_with_instruction() {
        assert_ne!(
            fingerprint(b"marksheet", "extract name"),
            fingerprint(b"marksheet", "extract seat number")
        );
    }

    #[test]
    fn boundary_shift_does_not_collide() {
        assert_ne!(fingerprint(b"ab", "c"), fingerprint(b"a", "bc"));
        assert_ne!(fingerprint(b"", "abc"), fingerprint(b"abc", ""));
    }

    #[test]
    fn distinct_pairs_give_distinct_keys() {
        let docs: [&[u8]; 4] = [b"", b"\x00", b"card", b"card\x00"];
        let prompts = ["", "identity", "marksheet", "marksheet "];
        let mut seen = std::collections::HashSet::new();
        for doc in docs {
            for prompt in prompts {
                assert!(seen.insert(fingerprint(doc, prompt)), "collision for {doc:?}/{prompt:?}");
            }
        }
        assert_eq!(seen.len(), 16);
    }
}

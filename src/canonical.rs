//! Canonical serialization for deterministic hashing.
//!
//! Policy hashes, registry hashes and document fingerprints are all xxh64
//! over the JSON serialization of a value.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable Vec order: vectors serialize in index order
//! - No HashMap allowed: use BTreeMap for maps in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Only called on crate types whose serialization cannot fail (no maps with
/// non-string keys, no fallible `Serialize` impls).
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Entry {
        path: Vec<u32>,
        notation: String,
    }

    #[test]
    fn test_determinism() {
        let entry = Entry {
            path: vec![1, 2],
            notation: "(the/Md dog/Cc)".to_string(),
        };
        assert_eq!(canonical_hash(&entry), canonical_hash(&entry));
        assert_eq!(canonical_hash_hex(&entry).len(), 16);
    }

    #[test]
    fn test_btreemap_order_is_insertion_independent() {
        let mut a = BTreeMap::new();
        a.insert("s1", 1);
        a.insert("s0", 0);
        let mut b = BTreeMap::new();
        b.insert("s0", 0);
        b.insert("s1", 1);
        assert_eq!(canonical_hash_hex(&a), canonical_hash_hex(&b));
    }
}

//! Canonical source text for deterministic document hashing.
//!
//! ## Purpose
//!
//! Every compiled document records the SHA-256 of its annotation table so
//! a report can be matched back to the exact input it was produced from,
//! and so the document cache can key on content instead of file names.
//!
//! ## Canonical Source Specification
//!
//! ```text
//! canonical_source(text) = UTF-8(trim_newlines(strip_bom(normalize_newlines(text))))
//! ```
//!
//! Where:
//! - `normalize_newlines`: CRLF → LF, CR → LF
//! - `strip_bom`: a leading U+FEFF is removed
//! - `trim_newlines`: trailing line breaks are removed
//!
//! Leading line breaks are kept: diagnostics number rows in the canonical
//! text, which must match the input's line numbers. Spaces and tabs are
//! never trimmed: an empty trailing column is part of the table.

use sha2::{Digest, Sha256};

/// Version of the canonical source specification.
///
/// Changes to this version invalidate all recorded source hashes.
pub const CANONICAL_SOURCE_VERSION: &str = "1.0.0";

/// Normalize an annotation table to canonical form.
///
/// ```rust
/// use semhyp_kernel::canonical_content::normalize_source;
///
/// let table = "\u{feff}0\tHi\r\n\r\n";
/// assert_eq!(normalize_source(table), "0\tHi");
/// ```
pub fn normalize_source(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let normalized = normalized.strip_prefix('\u{feff}').unwrap_or(&normalized);
    normalized.trim_end_matches('\n').to_string()
}

/// Canonical UTF-8 bytes of an annotation table.
pub fn canonical_source(text: &str) -> Vec<u8> {
    normalize_source(text).into_bytes()
}

/// SHA-256 of the canonical source, as 64 lowercase hex characters.
///
/// ```rust
/// use semhyp_kernel::canonical_content::compute_source_hash;
///
/// let hash = compute_source_hash("0\tHello\tHello\tINTJ\tUH\tintj\t0\t-\t_");
/// assert_eq!(hash.len(), 64);
/// ```
pub fn compute_source_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_source(text));
    hex::encode(hasher.finalize())
}

/// Check a recorded source hash against a table, in constant time.
pub fn verify_source_hash(text: &str, expected_hash: &str) -> bool {
    let computed = compute_source_hash(text);
    if computed.len() != expected_hash.len() {
        return false;
    }
    computed
        .bytes()
        .zip(expected_hash.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newline_styles_hash_the_same() {
        let lf = "0\tA\n1\tB";
        let crlf = "0\tA\r\n1\tB";
        let cr = "0\tA\r1\tB";
        assert_eq!(compute_source_hash(lf), compute_source_hash(crlf));
        assert_eq!(compute_source_hash(lf), compute_source_hash(cr));
    }

    #[test]
    fn test_trailing_blank_lines_ignored() {
        assert_eq!(compute_source_hash("0\tA\n\n"), compute_source_hash("0\tA"));
        assert_eq!(normalize_source("\u{feff}0\tA\n"), "0\tA");
    }

    #[test]
    fn test_leading_blank_lines_keep_row_numbers() {
        assert_eq!(normalize_source("\r\n\r\n0\tA"), "\n\n0\tA");
        assert_ne!(compute_source_hash("\n\n0\tA"), compute_source_hash("0\tA"));
    }

    #[test]
    fn test_trailing_columns_are_significant() {
        assert_ne!(compute_source_hash("0\tA\t"), compute_source_hash("0\tA"));
        assert_ne!(compute_source_hash(" 0\tA"), compute_source_hash("0\tA"));
    }

    #[test]
    fn test_known_values() {
        assert_eq!(
            compute_source_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            compute_source_hash("Hello World\n"),
            "a591a6d40bf420404a011733cfb7b190d62c65bf0bcda32b57b277d9ad9f146e"
        );
    }

    #[test]
    fn test_verify_source_hash() {
        let table = "0\tHi\tHi\tINTJ\tUH\tROOT\t0\t-\t_";
        let hash = compute_source_hash(table);
        assert!(verify_source_hash(table, &hash));
        assert!(!verify_source_hash(table, &"0".repeat(64)));
        assert!(!verify_source_hash(table, "abc"));
    }
}

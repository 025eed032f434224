//! Checksum validation for migrations
//!
//! Computes SHA256 checksums of migration SQL to detect edits to applied migrations

use sha2::{Digest, Sha256};

/// Compute SHA256 checksum of a string
pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let a = compute_checksum("CREATE TABLE t (x)");
        assert_eq!(a.len(), 64);
        assert_eq!(a, compute_checksum("CREATE TABLE t (x)"));
        assert_ne!(a, compute_checksum("CREATE TABLE t (y)"));
    }
}

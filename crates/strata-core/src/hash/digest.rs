use sha2::{Digest, Sha256};

use super::canonical::{canonical_string, site_fingerprint};
use crate::errors::Result;
use crate::model::EntityRef;
use crate::ops::Store;

/// SHA-256 hex digest of the canonical string of one entity
///
/// # Errors
///
/// Same as [`canonical_string`].
pub fn canonical_digest(store: &Store, root: &EntityRef) -> Result<String> {
    Ok(hash_string(&canonical_string(store, root)?))
}

/// SHA-256 hex digest of the whole deployable state
pub fn site_digest(store: &Store) -> String {
    hash_string(&site_fingerprint(store))
}

/// Hex-encoded SHA256 of a string (64 characters)
pub fn hash_string(input: &str) -> String {
    hash_bytes(input.as_bytes())
}

pub fn hash_bytes(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_string_known_value() {
        assert_eq!(
            hash_string(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(hash_string("abc").len(), 64);
    }

    #[test]
    fn test_empty_store_digest_is_stable() {
        let a = Store::new();
        let b = Store::new();
        assert_eq!(site_digest(&a), site_digest(&b));
    }
}

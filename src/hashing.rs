//! Hashing System - Content-Addressed Manifest Names
//!
//! The manifest file name carries the first 8 hex characters of the SHA-256
//! digest of its serialized JSON, so identical manifests share a name.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex characters of the digest kept in file names.
pub const CONTENT_HASH_LEN: usize = 8;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Short content hash used in the manifest file name
pub fn content_hash(data: &[u8]) -> String {
    let mut digest = sha256_hex(data);
    digest.truncate(CONTENT_HASH_LEN);
    digest
}

/// Serialize a manifest as 2-space indented JSON, keeping key insertion order
pub fn manifest_json<T: Serialize>(manifest: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(manifest)
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_content_hash_is_eight_lowercase_hex() {
        let h = content_hash(b"{}");
        assert_eq!(h.len(), CONTENT_HASH_LEN);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(content_hash(b"abc"), "ba7816bf");
    }

    #[test]
    fn test_hash_deterministic() {
        let data = b"test data";
        assert_eq!(content_hash(data), content_hash(data));
        assert_ne!(content_hash(b"test data"), content_hash(b"test datb"));
    }

    #[test]
    fn test_manifest_json_keeps_insertion_order() {
        let manifest = json!({"name": "x", "display": "browser", "icons": []});
        let s = manifest_json(&manifest).unwrap();
        let name = s.find("\"name\"").unwrap();
        let display = s.find("\"display\"").unwrap();
        let icons = s.find("\"icons\"").unwrap();
        assert!(name < display && display < icons);
        assert!(s.contains("\n  \"name\""));
    }
}

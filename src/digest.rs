//! SHA-256 digest over byte spans.
//!
//! Every snapshot written to an archive is checksummed so that a reader
//! can detect any silent corruption of the data files.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of `bytes` as lowercase hex.
///
/// Deterministic, 64 hex characters, no separators.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Expected values are the published SHA-256 test vectors.
    #[test]
    fn test_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_abc() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_lowercase_hex_output() {
        let digest = sha256_hex(&[0u8, 1, 2, 3]);
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_deterministic() {
        let data = vec![0xabu8; 1024];
        assert_eq!(sha256_hex(&data), sha256_hex(&data));
    }
}

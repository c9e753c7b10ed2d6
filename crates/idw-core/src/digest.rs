//! # Block Digests
//!
//! Defines `BlockDigest`, the SHA-256 hash of a block's encoded bytes. Block
//! digests are what signatures sign: the host variant exponentiates one, the
//! client and credentials variants fold one into their Fiat–Shamir challenge
//! with [`BlockDigest::xor`].
//!
//! ## Invariant
//!
//! A digest covers the encoded bytes only. The semantic type of a block is
//! implicit on the wire, so two blocks of different types with the same bytes
//! share a digest even though they are not equal.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of bytes in a block digest.
pub const DIGEST_LENGTH: usize = 32;

/// A SHA-256 digest of encoded block bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockDigest(pub [u8; DIGEST_LENGTH]);

impl BlockDigest {
    /// Hash the given bytes.
    pub fn of(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        let mut out = [0u8; DIGEST_LENGTH];
        out.copy_from_slice(&hash);
        Self(out)
    }

    /// Hash the concatenation of several byte sequences.
    pub fn of_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        let mut out = [0u8; DIGEST_LENGTH];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    /// Return the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    /// Bitwise exclusive or with another digest.
    pub fn xor(&self, other: &BlockDigest) -> BlockDigest {
        let mut out = [0u8; DIGEST_LENGTH];
        for (o, (a, b)) in out.iter_mut().zip(self.0.iter().zip(other.0.iter())) {
            *o = a ^ b;
        }
        BlockDigest(out)
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for BlockDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sha256_vector() {
        let digest = BlockDigest::of(b"{}");
        assert_eq!(
            digest.to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_of_parts_matches_concatenation() {
        let joined = BlockDigest::of(b"hello world");
        let parts = BlockDigest::of_parts([b"hello".as_slice(), b" ".as_slice(), b"world".as_slice()]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn test_xor_is_involution() {
        let a = BlockDigest::of(b"a");
        let b = BlockDigest::of(b"b");
        assert_eq!(a.xor(&b).xor(&b), a);
        assert_eq!(a.xor(&a), BlockDigest([0u8; DIGEST_LENGTH]));
    }

    #[test]
    fn test_display_prefix() {
        let s = BlockDigest::of(b"x").to_string();
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64);
    }
}

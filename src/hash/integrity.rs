//! Incremental hashers for the supported digest algorithms
//!
//! SHA-256 is the primary algorithm; MD5 is kept for legacy manifests.
//! Every hasher supports reset so pooled instances can be reused.

use crate::config::{DigestCase, HashAlgorithm};
use sha2::Digest;

/// Unified hasher that supports all algorithms
#[derive(Clone)]
pub enum Hasher {
    /// SHA-256
    Sha256(sha2::Sha256),
    /// MD5
    Md5(md5::Md5),
}

impl Hasher {
    /// Create a new hasher for the given algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Md5 => Self::Md5(md5::Md5::new()),
        }
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Md5(h) => h.update(data),
        }
    }

    /// Finalize into raw digest bytes, leaving the hasher in its initial state
    pub fn finalize_reset(&mut self) -> Vec<u8> {
        match self {
            Self::Sha256(h) => h.finalize_reset().to_vec(),
            Self::Md5(h) => h.finalize_reset().to_vec(),
        }
    }

    /// Reset the hasher for reuse
    pub fn reset(&mut self) {
        match self {
            Self::Sha256(h) => Digest::reset(h),
            Self::Md5(h) => Digest::reset(h),
        }
    }
}

/// Digest of one file's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Hex-encoded digest
    pub hex: String,
    /// Number of content bytes hashed
    pub bytes: u64,
}

impl std::fmt::Display for FileDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hex)
    }
}

/// Compute the uppercase hex digest of data in memory
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> String {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    DigestCase::Upper.encode(&hasher.finalize_reset())
}

//! Digest engine
//!
//! Computes the digest of a single file by streaming it through a pooled
//! hasher in fixed-size chunks. Hashers and I/O buffers come from pools owned
//! by the engine, so a long run over many small files allocates almost
//! nothing per file.

use super::integrity::{FileDigest, Hasher};
use super::pool::ResourcePool;
use crate::config::{DigestCase, HashAlgorithm};
use crate::error::{HasherError, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use tracing::debug;

/// Size of each read fed into the hasher
pub const DIGEST_CHUNK_SIZE: usize = 64 * 1024;

/// Idle hashers and buffers kept per pool; matches the worker cap
pub const DEFAULT_POOL_RETENTION: usize = crate::config::MAX_WORKERS;

/// Computes file digests with pooled hash state and buffers
pub struct DigestEngine {
    case: DigestCase,
    hashers: ResourcePool<Hasher>,
    buffers: ResourcePool<Vec<u8>>,
}

impl DigestEngine {
    /// Create an engine for the given algorithm, emitting uppercase hex
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self::with_retention(algorithm, DEFAULT_POOL_RETENTION)
    }

    /// Create an engine that keeps at most `retention` idle instances per pool
    pub fn with_retention(algorithm: HashAlgorithm, retention: usize) -> Self {
        Self {
            case: DigestCase::Upper,
            hashers: ResourcePool::new(move || Hasher::new(algorithm), Hasher::reset, retention),
            buffers: ResourcePool::new(
                || vec![0u8; DIGEST_CHUNK_SIZE],
                |buf: &mut Vec<u8>| {
                    buf.clear();
                    buf.resize(DIGEST_CHUNK_SIZE, 0);
                },
                retention,
            ),
        }
    }

    /// Set the case of emitted digests
    pub fn with_case(mut self, case: DigestCase) -> Self {
        self.case = case;
        self
    }

    /// Hasher pool, exposed for instrumentation
    pub fn hasher_pool(&self) -> &ResourcePool<Hasher> {
        &self.hashers
    }

    /// Buffer pool, exposed for instrumentation
    pub fn buffer_pool(&self) -> &ResourcePool<Vec<u8>> {
        &self.buffers
    }

    /// Compute the digest of the file at `path`.
    ///
    /// Open and read failures are returned as-is; there is no retry. The file
    /// handle and both pooled resources are released on every return path.
    pub fn compute_digest(&self, path: &Path) -> Result<FileDigest> {
        let file = File::open(path).map_err(|e| HasherError::io(path, e))?;
        let mut reader = BufReader::with_capacity(DIGEST_CHUNK_SIZE, file);

        let mut hasher = self.hashers.acquire();
        let mut buffer = self.buffers.acquire();
        let mut bytes = 0u64;

        loop {
            let read = match reader.read(&mut buffer[..]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HasherError::io(path, e)),
            };
            hasher.update(&buffer[..read]);
            bytes += read as u64;
        }

        let hex = self.case.encode(&hasher.finalize_reset());
        debug!(path = %path.display(), bytes, "digest computed");

        Ok(FileDigest { hex, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_known_file_digest() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "notes.txt", b"This is a test file for SHA256 hashing.");

        let engine = DigestEngine::new(HashAlgorithm::Sha256);
        let digest = engine.compute_digest(&path).unwrap();

        assert_eq!(
            digest.hex,
            "9C495B60E232739F0E1777969172C84520F33837C877A6719A9256676F26927F"
        );
        assert_eq!(digest.bytes, 39);
    }

    #[test]
    fn test_digest_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.bin", b"same content every time");
        let engine = DigestEngine::new(HashAlgorithm::Sha256);

        let first = engine.compute_digest(&path).unwrap();
        let second = engine.compute_digest(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_pooled_state_does_not_leak_between_files() {
        let dir = TempDir::new().unwrap();
        let contents: Vec<Vec<u8>> = (0..6u8).map(|i| vec![i; 1000 + i as usize * 7]).collect();
        let paths: Vec<_> = contents
            .iter()
            .enumerate()
            .map(|(i, c)| write_file(dir.path(), &format!("f{i}"), c))
            .collect();

        let engine = DigestEngine::with_retention(HashAlgorithm::Md5, 1);
        for (path, content) in paths.iter().zip(&contents).rev() {
            let digest = engine.compute_digest(path).unwrap();
            assert_eq!(digest.hex, hash_bytes(content, HashAlgorithm::Md5));
        }
        assert_eq!(engine.hasher_pool().created(), 1);
        assert_eq!(engine.buffer_pool().created(), 1);
    }

    #[test]
    fn test_file_larger_than_chunk() {
        let dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..DIGEST_CHUNK_SIZE * 3 + 123).map(|i| (i % 251) as u8).collect();
        let path = write_file(dir.path(), "large.bin", &content);

        let digest = DigestEngine::new(HashAlgorithm::Sha256).compute_digest(&path).unwrap();
        assert_eq!(digest.hex, hash_bytes(&content, HashAlgorithm::Sha256));
        assert_eq!(digest.bytes, content.len() as u64);
    }

    #[test]
    fn test_lowercase_engine() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "hello.txt", b"hello\n");

        let engine = DigestEngine::new(HashAlgorithm::Sha256).with_case(DigestCase::Lower);
        let digest = engine.compute_digest(&path).unwrap();
        assert_eq!(
            digest.hex,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn test_missing_file_returns_resources() {
        let dir = TempDir::new().unwrap();
        let engine = DigestEngine::new(HashAlgorithm::Sha256);

        let err = engine.compute_digest(&dir.path().join("non_existent_file.txt")).unwrap_err();
        assert!(matches!(err, HasherError::NotFound(_)));
        assert!(err.to_string().contains("non_existent_file.txt"));
        assert_eq!(engine.hasher_pool().created(), 0);
    }

    #[test]
    fn test_directory_read_error_releases_pools() {
        let dir = TempDir::new().unwrap();
        let engine = DigestEngine::new(HashAlgorithm::Sha256);

        // Opening a directory succeeds on Unix but reading it fails.
        if engine.compute_digest(dir.path()).is_err() {
            let created = engine.hasher_pool().created();
            assert_eq!(engine.hasher_pool().idle_count(), created);
            assert_eq!(engine.buffer_pool().idle_count(), engine.buffer_pool().created());
        }
    }
}

//! Artifact digest computation
//!
//! Streams artifact bytes through SHA-256. The digest is the unit of
//! attestation: every SCT signs over it, so identical bytes must always
//! produce an identical digest.

use sha2::{Digest as _, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files during hashing (1MB)
const CHUNK_SIZE: usize = 1024 * 1024;

/// Threshold for showing progress (100MB)
const PROGRESS_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Length of a SHA-256 digest in bytes
pub const DIGEST_LEN: usize = 32;

/// SHA-256 digest of an artifact's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Parse a hex digest. Case-insensitive, surrounding whitespace ignored.
    pub fn from_hex(s: &str) -> Result<Self, DigestParseError> {
        let trimmed = s.trim();
        let bytes = hex::decode(trimmed).map_err(|_| DigestParseError(trimmed.to_string()))?;
        let arr: [u8; DIGEST_LEN] = bytes
            .try_into()
            .map_err(|_| DigestParseError(trimmed.to_string()))?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl std::str::FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// A string that is not a 64-character hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sha256 digest '{0}': expected 64 hex characters")]
pub struct DigestParseError(String);

/// Incremental SHA-256 accumulator.
///
/// Shared by [`compute`] and the transport's first-line checksum so both
/// hash bytes the same way.
#[derive(Clone, Default)]
pub struct StreamingDigest {
    hasher: Sha256,
}

impl StreamingDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    pub fn finish(self) -> Digest {
        Digest(self.hasher.finalize().into())
    }
}

/// Compute the digest of a byte stream without buffering it whole.
pub fn compute(reader: impl Read) -> std::io::Result<Digest> {
    compute_with_progress(reader, 0, false)
}

/// Compute the digest of a file on disk.
///
/// Shows progress for files larger than 100MB.
pub fn compute_file(path: &Path) -> std::io::Result<Digest> {
    let f = std::fs::File::open(path)?;
    let file_size = f.metadata().map(|m| m.len()).unwrap_or(0);
    compute_with_progress(f, file_size, file_size > PROGRESS_THRESHOLD)
}

fn compute_with_progress(
    mut reader: impl Read,
    file_size: u64,
    show_progress: bool,
) -> std::io::Result<Digest> {
    let mut digest = StreamingDigest::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total_read = 0u64;
    let mut last_percent = 0u8;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        digest.update(&buffer[..n]);
        total_read += n as u64;

        if show_progress && file_size > 0 {
            let percent = ((total_read * 100) / file_size).min(100) as u8;
            if percent >= last_percent + 10 {
                print!("\r     sha256: {}%...", percent);
                std::io::Write::flush(&mut std::io::stdout()).ok();
                last_percent = percent;
            }
        }
    }

    if show_progress {
        println!();
    }

    Ok(digest.finish())
}

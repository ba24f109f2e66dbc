// Digest engine: a SHA-256 fingerprint of a file's full content, computed
// in one streaming pass. The digest is the only thing the dedup decision
// trusts, so identical bytes must always give identical hex.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::DigestError;

const READ_BUF: usize = 64 * 1024;

/// Lowercase hex SHA-256 of a file's content (64 characters).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Hash an in-memory buffer. Mostly useful for tests and fakes.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.short())
    }
}

/// Stream `path` through SHA-256 without holding the whole file in memory.
///
/// The file handle is dropped on every return path, including read errors
/// halfway through.
pub fn digest(path: &Path) -> Result<ContentDigest, DigestError> {
    let io_err = |source| DigestError {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUF];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_err(e)),
        };
        hasher.update(&buf[..n]);
    }
    Ok(ContentDigest(hex::encode(hasher.finalize())))
}

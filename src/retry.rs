// Transport-level retry decorator. Wraps any `RemoteStore` and repeats a
// single failed call while the error is retriable, sleeping
// `backoff * attempt` between tries. It applies to every operation kind
// the same way; the dedup logic above it never retries on its own.

use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::api::RemoteStore;
use crate::digest::ContentDigest;
use crate::error::StoreError;

pub struct Retrying<S> {
    inner: S,
    max_attempts: usize,
    backoff: Duration,
}

impl<S: RemoteStore> Retrying<S> {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(inner: S, max_attempts: usize, backoff: Duration) -> Self {
        Retrying {
            inner,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn run<T>(
        &self,
        op: &str,
        mut call: impl FnMut(&S) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt = 1;
        loop {
            match call(&self.inner) {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_attempts && e.is_retriable() => {
                    warn!(op, attempt, error = %e, "remote call failed, retrying");
                    std::thread::sleep(self.backoff.saturating_mul(attempt as u32));
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<S: RemoteStore> RemoteStore for Retrying<S> {
    fn find_match(&self, digest: &ContentDigest) -> Result<Option<String>, StoreError> {
        self.run("lookup", |s| s.find_match(digest))
    }

    fn upload(&self, path: &Path, name: &str, digest: &ContentDigest) -> Result<(), StoreError> {
        self.run("upload", |s| s.upload(path, name, digest))
    }

    fn copy(&self, src: &str, dest: &str, digest: &ContentDigest) -> Result<(), StoreError> {
        self.run("copy", |s| s.copy(src, dest, digest))
    }

    fn update(&self, path: &Path, name: &str, digest: &ContentDigest) -> Result<(), StoreError> {
        self.run("update", |s| s.update(path, name, digest))
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.run("delete", |s| s.delete(name))
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        self.run("list", |s| s.list())
    }
}

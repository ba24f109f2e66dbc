// In-memory stand-in for the remote store. It keeps stored names and their
// content, counts every call, and can be told to fail lookups or uploads.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use filestore_cli::{ContentDigest, RemoteStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupMode {
    #[default]
    Normal,
    /// Lookups answer 503.
    Unavailable,
    /// Lookups answer 200 with a body that does not parse.
    Garbage,
}

#[derive(Default)]
struct State {
    files: BTreeMap<String, Vec<u8>>,
    lookups: usize,
    uploads: usize,
    copies: usize,
    updates: usize,
    bytes_received: usize,
    upload_log: Vec<String>,
}

#[derive(Default)]
pub struct FakeStore {
    pub(crate) state: Mutex<State>,
    pub lookup_mode: LookupMode,
    pub reject_uploads: bool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookup(mode: LookupMode) -> Self {
        FakeStore {
            lookup_mode: mode,
            ..Self::default()
        }
    }

    pub fn lookups(&self) -> usize {
        self.state.lock().unwrap().lookups
    }

    pub fn uploads(&self) -> usize {
        self.state.lock().unwrap().uploads
    }

    pub fn copies(&self) -> usize {
        self.state.lock().unwrap().copies
    }

    pub fn updates(&self) -> usize {
        self.state.lock().unwrap().updates
    }

    /// Total file bytes that crossed the "wire".
    pub fn bytes_received(&self) -> usize {
        self.state.lock().unwrap().bytes_received
    }

    /// Names passed to `upload`, in call order.
    pub fn upload_log(&self) -> Vec<String> {
        self.state.lock().unwrap().upload_log.clone()
    }

    pub fn content(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(name).cloned()
    }

    fn read(path: &Path) -> Result<Vec<u8>, StoreError> {
        std::fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl RemoteStore for FakeStore {
    fn find_match(&self, digest: &ContentDigest) -> Result<Option<String>, StoreError> {
        let mut st = self.state.lock().unwrap();
        st.lookups += 1;
        match self.lookup_mode {
            LookupMode::Unavailable => Err(StoreError::Status {
                status: 503,
                body: "lookup index offline".into(),
            }),
            LookupMode::Garbage => {
                filestore_cli::api::parse_lookup("<html>oops</html>").map(|_| None)
            }
            LookupMode::Normal => Ok(st
                .files
                .iter()
                .find(|(_, data)| ContentDigest::of_bytes(data) == *digest)
                .map(|(name, _)| name.clone())),
        }
    }

    fn upload(&self, path: &Path, name: &str, digest: &ContentDigest) -> Result<(), StoreError> {
        if self.reject_uploads {
            return Err(StoreError::Status {
                status: 507,
                body: "insufficient storage".into(),
            });
        }
        let data = Self::read(path)?;
        assert_eq!(ContentDigest::of_bytes(&data), *digest, "digest sent with upload must match");
        let mut st = self.state.lock().unwrap();
        st.uploads += 1;
        st.bytes_received += data.len();
        st.upload_log.push(name.to_string());
        st.files.insert(name.to_string(), data);
        Ok(())
    }

    fn copy(&self, src: &str, dest: &str, _: &ContentDigest) -> Result<(), StoreError> {
        let mut st = self.state.lock().unwrap();
        st.copies += 1;
        let data = st.files.get(src).cloned().ok_or_else(|| StoreError::Status {
            status: 404,
            body: format!("{src} not found"),
        })?;
        st.files.insert(dest.to_string(), data);
        Ok(())
    }

    fn update(&self, path: &Path, name: &str, _: &ContentDigest) -> Result<(), StoreError> {
        let data = Self::read(path)?;
        let mut st = self.state.lock().unwrap();
        st.updates += 1;
        st.bytes_received += data.len();
        st.files.insert(name.to_string(), data);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut st = self.state.lock().unwrap();
        match st.files.remove(name) {
            Some(_) => Ok(()),
            None => Err(StoreError::Status {
                status: 404,
                body: String::new(),
            }),
        }
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.state.lock().unwrap().files.keys().cloned().collect())
    }
}

/// Write `content` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn name_of(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

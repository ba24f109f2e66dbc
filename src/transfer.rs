// Transfer orchestrator: turns a `MatchOutcome` into the smallest remote
// operation that leaves the store holding `name`, and reports exactly one
// terminal `TransferResult`. File bytes are only sent on `NoMatch` and on
// `QueryFailed`; an aliasable duplicate is materialized server-side.

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::api::RemoteStore;
use crate::digest::{self, ContentDigest};
use crate::resolver::MatchOutcome;

/// Reason recorded when the store already has the file under its name.
pub const ALREADY_PRESENT: &str = "already present";

/// Terminal status of one file. Only used for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult {
    Uploaded,
    /// Created server-side from content already stored under this name.
    Aliased(String),
    Updated,
    Skipped(String),
    Failed(String),
}

impl TransferResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, TransferResult::Failed(_))
    }
}

impl fmt::Display for TransferResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferResult::Uploaded => f.write_str("Uploaded"),
            TransferResult::Aliased(src) => write!(f, "Aliased({src})"),
            TransferResult::Updated => f.write_str("Updated"),
            TransferResult::Skipped(reason) => write!(f, "Skipped ({reason})"),
            TransferResult::Failed(cause) => write!(f, "Failed ({cause})"),
        }
    }
}

/// Failure cause for paths that cannot be sent as a remote name.
pub const NON_UTF8_NAME: &str = "path is not valid UTF-8";

/// Remote name for a local path: the path exactly as the user gave it.
/// `None` for non-UTF-8 paths, which would otherwise be mangled into names
/// that can collide.
pub fn remote_name(path: &Path) -> Option<String> {
    path.to_str().map(str::to_string)
}

/// Act on `outcome` for the file at `path`, stored remotely as `name`.
pub fn transfer<S: RemoteStore + ?Sized>(
    store: &S,
    path: &Path,
    name: &str,
    digest: &ContentDigest,
    outcome: MatchOutcome,
) -> TransferResult {
    match outcome {
        MatchOutcome::MatchedSameName => {
            info!(name, "already stored under this name");
            TransferResult::Skipped(ALREADY_PRESENT.into())
        }
        MatchOutcome::MatchedOtherName(src) => match store.copy(&src, name, digest) {
            Ok(()) => {
                info!(name, src = %src, "aliased existing content");
                TransferResult::Aliased(src)
            }
            Err(e) => {
                warn!(name, src = %src, error = %e, "alias failed");
                TransferResult::Failed(format!("alias from {src}: {e}"))
            }
        },
        MatchOutcome::QueryFailed(_) | MatchOutcome::NoMatch => {
            match store.upload(path, name, digest) {
                Ok(()) => {
                    info!(name, digest = digest.short(), "uploaded");
                    TransferResult::Uploaded
                }
                Err(e) => {
                    warn!(name, error = %e, "upload failed");
                    TransferResult::Failed(format!("upload: {e}"))
                }
            }
        }
    }
}

/// Replace the content stored under `name` with the local file. No lookup
/// is done; the full content is always sent.
pub fn update<S: RemoteStore + ?Sized>(store: &S, path: &Path, name: &str) -> TransferResult {
    let digest = match digest::digest(path) {
        Ok(d) => d,
        Err(e) => return TransferResult::Failed(e.to_string()),
    };
    match store.update(path, name, &digest) {
        Ok(()) => {
            info!(name, digest = digest.short(), "updated");
            TransferResult::Updated
        }
        Err(e) => {
            warn!(name, error = %e, "update failed");
            TransferResult::Failed(format!("update: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::cell::RefCell;

    /// Records each call by kind; `fail` makes every call answer 500.
    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn record(&self, call: String) -> Result<(), StoreError> {
            self.calls.borrow_mut().push(call);
            if self.fail {
                Err(StoreError::Status {
                    status: 500,
                    body: "boom".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl RemoteStore for Recorder {
        fn find_match(&self, _: &ContentDigest) -> Result<Option<String>, StoreError> {
            self.record("lookup".into()).map(|_| None)
        }
        fn upload(&self, _: &Path, name: &str, _: &ContentDigest) -> Result<(), StoreError> {
            self.record(format!("upload {name}"))
        }
        fn copy(&self, src: &str, dest: &str, _: &ContentDigest) -> Result<(), StoreError> {
            self.record(format!("copy {src} {dest}"))
        }
        fn update(&self, _: &Path, name: &str, _: &ContentDigest) -> Result<(), StoreError> {
            self.record(format!("update {name}"))
        }
        fn delete(&self, name: &str) -> Result<(), StoreError> {
            self.record(format!("delete {name}"))
        }
        fn list(&self) -> Result<Vec<String>, StoreError> {
            self.record("list".into()).map(|_| Vec::new())
        }
    }

    fn d() -> ContentDigest {
        ContentDigest::of_bytes(b"payload")
    }

    #[test]
    fn no_match_uploads() {
        let store = Recorder::default();
        let r = transfer(&store, Path::new("a.txt"), "a.txt", &d(), MatchOutcome::NoMatch);
        assert_eq!(r, TransferResult::Uploaded);
        assert_eq!(*store.calls.borrow(), vec!["upload a.txt"]);
    }

    #[test]
    fn query_failed_uploads_like_no_match() {
        let store = Recorder::default();
        let outcome = MatchOutcome::QueryFailed(StoreError::Decode("x".into()));
        let r = transfer(&store, Path::new("a.txt"), "a.txt", &d(), outcome);
        assert_eq!(r, TransferResult::Uploaded);
        assert_eq!(*store.calls.borrow(), vec!["upload a.txt"]);
    }

    #[test]
    fn same_name_makes_no_remote_call() {
        let store = Recorder::default();
        let r = transfer(&store, Path::new("a.txt"), "a.txt", &d(), MatchOutcome::MatchedSameName);
        assert_eq!(r, TransferResult::Skipped(ALREADY_PRESENT.into()));
        assert!(store.calls.borrow().is_empty());
    }

    #[test]
    fn other_name_aliases_without_upload() {
        let store = Recorder::default();
        let outcome = MatchOutcome::MatchedOtherName("orig.txt".into());
        let r = transfer(&store, Path::new("copy.txt"), "copy.txt", &d(), outcome);
        assert_eq!(r, TransferResult::Aliased("orig.txt".into()));
        assert_eq!(*store.calls.borrow(), vec!["copy orig.txt copy.txt"]);
    }

    #[test]
    fn failed_alias_reports_cause_and_does_not_upload() {
        let store = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let outcome = MatchOutcome::MatchedOtherName("orig.txt".into());
        let r = transfer(&store, Path::new("copy.txt"), "copy.txt", &d(), outcome);
        match r {
            TransferResult::Failed(cause) => assert!(cause.contains("500"), "{cause}"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.calls.borrow().len(), 1);
    }

    #[test]
    fn failed_upload_carries_status() {
        let store = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let r = transfer(&store, Path::new("a.txt"), "a.txt", &d(), MatchOutcome::NoMatch);
        assert_eq!(
            r,
            TransferResult::Failed("upload: server responded 500: boom".into())
        );
    }

    #[test]
    fn update_sends_content_without_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"new content").unwrap();
        let store = Recorder::default();
        assert_eq!(update(&store, &path, "a.txt"), TransferResult::Updated);
        assert_eq!(*store.calls.borrow(), vec!["update a.txt"]);
    }

    #[test]
    fn update_of_unreadable_file_never_reaches_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Recorder::default();
        let r = update(&store, &dir.path().join("missing"), "missing");
        assert!(r.is_failed());
        assert!(store.calls.borrow().is_empty());
    }

    #[test]
    fn remote_name_is_the_path_as_given() {
        assert_eq!(remote_name(Path::new("docs/a.txt")).as_deref(), Some("docs/a.txt"));
        assert_eq!(remote_name(Path::new("./a.txt")).as_deref(), Some("./a.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_path_has_no_remote_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        let a = Path::new(OsStr::from_bytes(b"bad\xff.txt"));
        let b = Path::new(OsStr::from_bytes(b"bad\xfe.txt"));
        assert_eq!(remote_name(a), None);
        assert_eq!(remote_name(b), None);
    }

    #[test]
    fn display_forms() {
        assert_eq!(TransferResult::Uploaded.to_string(), "Uploaded");
        assert_eq!(TransferResult::Aliased("a.txt".into()).to_string(), "Aliased(a.txt)");
        assert_eq!(
            TransferResult::Skipped(ALREADY_PRESENT.into()).to_string(),
            "Skipped (already present)"
        );
    }
}

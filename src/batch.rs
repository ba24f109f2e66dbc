// Batch driver for `add`: digest, resolve and transfer each path, keep
// going past per-file failures, and report results in input order.
//
// With more than one job the paths are spread over scoped worker threads.
// Files with equal digests are serialized through a per-digest lock so two
// workers never both see `NoMatch` and upload the same content twice; the
// second one resolves after the first finished and gets an alias instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{bounded, unbounded};
use tracing::{debug, warn};

use crate::api::RemoteStore;
use crate::digest::{self, ContentDigest};
use crate::resolver;
use crate::transfer::{self, TransferResult};

/// Reason recorded for paths never started because of a stop request.
pub const CANCELLED: &str = "cancelled";

/// Ordered (path, result) pairs for one invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    entries: Vec<(PathBuf, TransferResult)>,
}

/// Per-result counts used for the closing summary line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub uploaded: usize,
    pub aliased: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn push(&mut self, path: PathBuf, result: TransferResult) {
        self.entries.push((path, result));
    }

    pub fn entries(&self) -> &[(PathBuf, TransferResult)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn any_failed(&self) -> bool {
        self.entries.iter().any(|(_, r)| r.is_failed())
    }

    /// True when the batch is non-empty and nothing in it succeeded.
    pub fn all_failed(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|(_, r)| r.is_failed())
    }

    pub fn summary(&self) -> Summary {
        let mut s = Summary::default();
        for (_, r) in &self.entries {
            match r {
                TransferResult::Uploaded => s.uploaded += 1,
                TransferResult::Aliased(_) => s.aliased += 1,
                TransferResult::Updated => s.updated += 1,
                TransferResult::Skipped(_) => s.skipped += 1,
                TransferResult::Failed(_) => s.failed += 1,
            }
        }
        s
    }
}

/// One lock per digest seen in this batch.
#[derive(Default)]
struct DigestLocks {
    inner: Mutex<HashMap<ContentDigest, Arc<Mutex<()>>>>,
}

impl DigestLocks {
    fn for_digest(&self, digest: &ContentDigest) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(digest.clone()).or_default())
    }
}

type Observer<'a> = dyn Fn(&Path, &TransferResult) + Sync + 'a;

/// Drives `add` over a list of paths against one store.
pub struct BatchDriver<'a, S: ?Sized> {
    store: &'a S,
    jobs: usize,
    stop: Option<&'a AtomicBool>,
    observer: Option<&'a Observer<'a>>,
    locks: DigestLocks,
}

impl<'a, S: RemoteStore + Sync + ?Sized> BatchDriver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        BatchDriver {
            store,
            jobs: 1,
            stop: None,
            observer: None,
            locks: DigestLocks::default(),
        }
    }

    /// Number of worker threads; values below 1 mean 1.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Checked before each file starts. Once set, the file in flight is
    /// finished and every path not yet started is reported as cancelled.
    pub fn stop_flag(mut self, stop: &'a AtomicBool) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Called once per file as soon as its result is known (completion
    /// order, which differs from input order when `jobs > 1`).
    pub fn observer(mut self, observer: &'a Observer<'a>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn run(&self, paths: &[PathBuf]) -> BatchReport {
        let results: Vec<TransferResult> = if self.jobs <= 1 || paths.len() <= 1 {
            paths.iter().map(|p| self.process(p)).collect()
        } else {
            self.run_parallel(paths)
        };
        let mut report = BatchReport::default();
        for (path, result) in paths.iter().zip(results) {
            report.push(path.clone(), result);
        }
        report
    }

    /// Hand `(index, path)` jobs to a bounded channel drained by `jobs`
    /// scoped workers; results come back tagged with their index and are
    /// put back into input order.
    fn run_parallel(&self, paths: &[PathBuf]) -> Vec<TransferResult> {
        let workers = self.jobs.min(paths.len());
        let (job_tx, job_rx) = bounded::<(usize, &PathBuf)>(workers);
        let (done_tx, done_rx) = unbounded::<(usize, TransferResult)>();
        std::thread::scope(|scope| {
            for _ in 0..workers {
                let jobs = job_rx.clone();
                let done = done_tx.clone();
                scope.spawn(move || {
                    for (i, path) in jobs {
                        if done.send((i, self.process(path))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(done_tx);
            for job in paths.iter().enumerate() {
                if job_tx.send(job).is_err() {
                    break;
                }
            }
            drop(job_tx);
        });
        let mut results: Vec<(usize, TransferResult)> = done_rx.iter().collect();
        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, result)| result).collect()
    }

    fn stopped(&self) -> bool {
        self.stop.is_some_and(|s| s.load(Ordering::SeqCst))
    }

    /// Full pipeline for one path. Never panics on I/O or remote errors;
    /// every failure becomes a `TransferResult::Failed`.
    fn process(&self, path: &Path) -> TransferResult {
        let result = if self.stopped() {
            TransferResult::Skipped(CANCELLED.into())
        } else {
            self.add_one(path)
        };
        if let Some(observe) = self.observer {
            observe(path, &result);
        }
        result
    }

    fn add_one(&self, path: &Path) -> TransferResult {
        let Some(name) = transfer::remote_name(path) else {
            warn!(path = %path.display(), "path is not valid UTF-8");
            return TransferResult::Failed(transfer::NON_UTF8_NAME.into());
        };
        let digest = match digest::digest(path) {
            Ok(d) => d,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                return TransferResult::Failed(e.to_string());
            }
        };
        let lock = self.locks.for_digest(&digest);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(name = %name, digest = digest.short(), "processing");
        let outcome = resolver::resolve(self.store, &name, &digest);
        transfer::transfer(self.store, path, &name, &digest, outcome)
    }
}

/// Sequential `add` over `paths` with no stop flag or observer.
pub fn run<S: RemoteStore + Sync + ?Sized>(store: &S, paths: &[PathBuf]) -> BatchReport {
    BatchDriver::new(store).run(paths)
}

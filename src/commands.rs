// Command handlers called from `main`. `add` runs the batch driver; the
// rest are single requests whose outcome is printed and mapped to an exit
// status.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::api::RemoteStore;
use crate::batch::{BatchDriver, BatchReport};
use crate::transfer::{self, TransferResult};
use crate::ui;

/// When `add` should make the process exit non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitPolicy {
    /// Only when every file in the batch failed.
    #[default]
    AllFailed,
    /// As soon as any file failed.
    AnyFailed,
}

impl ExitPolicy {
    pub fn is_failure(self, report: &BatchReport) -> bool {
        match self {
            ExitPolicy::AllFailed => report.all_failed(),
            ExitPolicy::AnyFailed => report.any_failed(),
        }
    }
}

/// Run `add` over `paths`, printing one line per file and a summary.
/// Returns the report so the caller can decide the exit status.
pub fn add<S: RemoteStore + Sync + ?Sized>(
    store: &S,
    paths: &[PathBuf],
    jobs: usize,
) -> BatchReport {
    let pb = ui::batch_progress(paths.len() as u64);
    let tick = |path: &Path, _: &TransferResult| {
        pb.set_message(path.display().to_string());
        pb.inc(1);
    };
    let report = BatchDriver::new(store)
        .jobs(jobs)
        .observer(&tick)
        .run(paths);
    pb.finish_and_clear();
    ui::print_report(&report);
    report
}

/// Replace the remote content of `path` with the local file.
pub fn update<S: RemoteStore + ?Sized>(store: &S, path: &Path) -> TransferResult {
    let result = match transfer::remote_name(path) {
        Some(name) => {
            let spinner = ui::spinner(&format!("Updating {name}..."));
            let result = transfer::update(store, path, &name);
            spinner.finish_and_clear();
            result
        }
        None => TransferResult::Failed(transfer::NON_UTF8_NAME.into()),
    };
    println!("{}: {}", path.display(), result);
    result
}

/// Delete `name` from the store, asking first unless `assume_yes`.
/// Returns `Ok(false)` when the user declined.
pub fn remove<S: RemoteStore + ?Sized>(store: &S, name: &str, assume_yes: bool) -> Result<bool> {
    if !assume_yes && !ui::confirm(&format!("Delete '{name}' from the store?"))? {
        println!("Not deleted (pass --yes to skip the prompt).");
        return Ok(false);
    }
    store
        .delete(name)
        .with_context(|| format!("could not delete '{name}'"))?;
    println!("Deleted {name}.");
    Ok(true)
}

pub fn list<S: RemoteStore + ?Sized>(store: &S) -> Result<()> {
    let names = store.list().context("could not list files")?;
    ui::print_listing(&names);
    Ok(())
}

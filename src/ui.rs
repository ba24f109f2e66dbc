// UI layer: everything printed to the terminal. Report lines go to stdout,
// one per file; progress bars and spinners go to stderr and are hidden
// when stderr is not a terminal so piped output stays clean.

use std::io::IsTerminal;

use anyhow::Result;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use crate::batch::{BatchReport, Summary};

/// Progress bar for a batch of `len` files.
pub fn batch_progress(len: u64) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}") {
        pb.set_style(style);
    }
    pb
}

/// Spinner shown while a single request is in flight.
pub fn spinner(msg: &str) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

/// `path: Result` lines in input order.
pub fn report_lines(report: &BatchReport) -> Vec<String> {
    report
        .entries()
        .iter()
        .map(|(path, result)| format!("{}: {}", path.display(), result))
        .collect()
}

pub fn summary_line(s: &Summary) -> String {
    let mut parts = Vec::new();
    for (count, label) in [
        (s.uploaded, "uploaded"),
        (s.aliased, "aliased"),
        (s.updated, "updated"),
        (s.skipped, "skipped"),
        (s.failed, "failed"),
    ] {
        if count > 0 {
            parts.push(format!("{count} {label}"));
        }
    }
    if parts.is_empty() {
        "nothing to do".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn print_report(report: &BatchReport) {
    for line in report_lines(report) {
        println!("{line}");
    }
    if report.len() > 1 {
        println!("{}", summary_line(&report.summary()));
    }
}

pub fn print_listing(names: &[String]) {
    if names.is_empty() {
        println!("No files stored.");
        return;
    }
    println!("List of Files:");
    for name in names {
        println!("{name}");
    }
}

/// Ask before a destructive action. Without a terminal to ask on, the
/// answer is "no" and the caller must be told to pass `--yes`.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        return Ok(false);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

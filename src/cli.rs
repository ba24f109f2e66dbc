use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "store",
    version,
    about = "Upload, list, update and delete files on a remote file store",
    long_about = None,
)]
pub struct Cli {
    /// Store address, e.g. http://localhost:8080 (overrides config and FILESTORE_URL).
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Config file (default: ~/.filestore/config.json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Attempts per remote call before giving up, the first one included.
    #[arg(long, global = true)]
    pub attempts: Option<usize>,

    /// More log output on stderr (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload files, reusing content the store already has.
    Add {
        #[arg(required = true, num_args = 1.., help = "Local files to add")]
        paths: Vec<PathBuf>,
        /// Files processed concurrently (max 8).
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Exit non-zero if any file failed, not only when all did.
        #[arg(long)]
        strict: bool,
    },
    /// Replace the stored content of a file.
    Update { path: PathBuf },
    /// Delete a file from the store.
    #[command(name = "rm")]
    Remove {
        name: String,
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// List stored files.
    #[command(name = "ls")]
    List,
}

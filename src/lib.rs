// Library root
// -----------
// The `store` binary is a thin shell over these modules, so everything
// that decides what to send to the remote store can be tested without a
// terminal or a server.
//
// Module responsibilities:
// - `config`: defaults, `~/.filestore/config.json` and environment overrides.
// - `error`: typed errors for local reads and remote calls.
// - `digest`: streaming SHA-256 of a local file.
// - `api`: the `RemoteStore` trait and its blocking HTTP implementation.
// - `retry`: retry-with-backoff decorator for any `RemoteStore`.
// - `resolver`: classifies a lookup answer into a `MatchOutcome`.
// - `transfer`: performs the minimal remote operation for an outcome.
// - `batch`: runs `add` over many paths and collects the ordered report.
// - `commands`: handlers behind each subcommand.
// - `ui`: report lines, progress bars and prompts.
// - `cli`: clap argument definitions.
pub mod api;
pub mod batch;
pub mod cli;
pub mod commands;
pub mod config;
pub mod digest;
pub mod error;
pub mod resolver;
pub mod retry;
pub mod transfer;
pub mod ui;

pub use api::{ApiClient, RemoteStore};
pub use batch::{BatchDriver, BatchReport};
pub use digest::ContentDigest;
pub use error::{DigestError, StoreError};
pub use resolver::MatchOutcome;
pub use transfer::TransferResult;

// Error types shared by the library modules. Every per-file failure ends
// up as one of these and is turned into a report line by the batch driver;
// none of them abort the process on their own.

use std::path::PathBuf;

use thiserror::Error;

/// The local file could not be opened or read while computing its digest.
#[derive(Debug, Error)]
#[error("cannot read {}: {source}", .path.display())]
pub struct DigestError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Failures talking to the remote store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connect, timeout or body read failure inside reqwest.
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-2xx status.
    #[error("server responded {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },

    /// The store answered 2xx but the body was not what we expected.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The file to be streamed could not be opened.
    #[error("cannot open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl StoreError {
    /// Whether a single failed call is worth repeating. Transport hiccups,
    /// server-side errors, request timeouts and throttling are; client errors
    /// and malformed bodies are not, since repeating them gives the same answer.
    pub fn is_retriable(&self) -> bool {
        match self {
            StoreError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            StoreError::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            StoreError::Decode(_) | StoreError::Io { .. } => false,
        }
    }
}

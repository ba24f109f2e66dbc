// Match resolver: one lookup against the store, classified into exactly
// one `MatchOutcome`. A failed or unreadable lookup is `QueryFailed`, never
// `NoMatch`, so a transport problem can't be mistaken for "not stored" or
// for "already stored".

use tracing::{debug, warn};

use crate::api::RemoteStore;
use crate::digest::ContentDigest;
use crate::error::StoreError;

/// Placeholder some store versions send instead of omitting the key.
const UNMATCHED_SENTINEL: &str = "unmatched";

#[derive(Debug)]
pub enum MatchOutcome {
    /// The store holds no content with this digest.
    NoMatch,
    /// The store already holds this content under the very same name.
    MatchedSameName,
    /// The store holds this content under another name.
    MatchedOtherName(String),
    /// The lookup could not be completed or understood.
    QueryFailed(StoreError),
}

/// Query the store for `digest` and classify the answer relative to `name`,
/// the remote name the local file would be stored under.
pub fn resolve<S: RemoteStore + ?Sized>(store: &S, name: &str, digest: &ContentDigest) -> MatchOutcome {
    let outcome = match store.find_match(digest) {
        Err(e) => MatchOutcome::QueryFailed(e),
        Ok(None) => MatchOutcome::NoMatch,
        Ok(Some(remote)) if remote.is_empty() || remote == UNMATCHED_SENTINEL => {
            MatchOutcome::NoMatch
        }
        Ok(Some(remote)) if remote == name => MatchOutcome::MatchedSameName,
        Ok(Some(remote)) => MatchOutcome::MatchedOtherName(remote),
    };
    match &outcome {
        MatchOutcome::QueryFailed(e) => {
            warn!(name, digest = digest.short(), error = %e, "lookup failed")
        }
        other => debug!(name, digest = digest.short(), outcome = ?other, "lookup"),
    }
    outcome
}

// API client module: a small blocking HTTP client for the remote file
// store. One `ApiClient` (and so one connection pool) is built per
// invocation and shared by reference with everything that talks to the
// store. The `RemoteStore` trait is the seam the dedup logic is written
// against, so it can be exercised without a server.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::Url;
use tracing::debug;

use crate::config::Config;
use crate::digest::ContentDigest;
use crate::error::StoreError;

/// JSON key the lookup endpoint answers with.
pub const MATCH_KEY: &str = "matchingFileName";

/// Operations the client needs from the store. Every method is exactly one
/// remote call; none of them retry (see `retry::Retrying` for that).
pub trait RemoteStore {
    /// Ask which stored name, if any, holds content with this digest.
    ///
    /// `Ok(None)` means the response carried no `matchingFileName` key (or
    /// a `null`). `Ok(Some(""))` is passed through as-is; deciding what an
    /// empty name means is the resolver's job.
    fn find_match(&self, digest: &ContentDigest) -> Result<Option<String>, StoreError>;

    /// Stream the file at `path` as new content stored under `name`.
    fn upload(&self, path: &Path, name: &str, digest: &ContentDigest) -> Result<(), StoreError>;

    /// Have the store copy already-held content from `src` to `dest`
    /// without any file bytes leaving this machine.
    fn copy(&self, src: &str, dest: &str, digest: &ContentDigest) -> Result<(), StoreError>;

    /// Replace the content stored under `name` with the file at `path`.
    fn update(&self, path: &Path, name: &str, digest: &ContentDigest) -> Result<(), StoreError>;

    fn delete(&self, name: &str) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// HTTP implementation of `RemoteStore`. Holds a reqwest blocking client
/// configured with the request timeout and the parsed base address.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client from the resolved configuration.
    pub fn new(cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid server address '{}'", cfg.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("invalid server address '{}'", cfg.base_url);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient { client, base_url })
    }

    /// Join path segments onto the base address. Each segment is
    /// percent-encoded on its own, so a name containing `/` stays one segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn upload_form(
        &self,
        path: &Path,
        name: &str,
        digest: &ContentDigest,
    ) -> Result<multipart::Form, StoreError> {
        let file = File::open(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let part = match file.metadata() {
            Ok(meta) => multipart::Part::reader_with_length(file, meta.len()),
            Err(_) => multipart::Part::reader(file),
        };
        let part = part
            .file_name(name.to_string())
            .mime_str("application/octet-stream")?;
        Ok(multipart::Form::new()
            .part("file", part)
            .text("hash", digest.to_string()))
    }
}

/// Read the whole body (so the connection can be reused) and turn non-2xx
/// statuses into `StoreError::Status`.
fn drain(res: Response) -> Result<String, StoreError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().unwrap_or_else(|_| "".into());
        return Err(StoreError::Status {
            status: status.as_u16(),
            body: body.trim().to_string(),
        });
    }
    Ok(res.text()?)
}

/// Interpret a lookup response body. Anything other than a JSON object with
/// an optional string (or null) under `matchingFileName` is a decode error,
/// never a silent "no match".
pub fn parse_lookup(body: &str) -> Result<Option<String>, StoreError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| StoreError::Decode(format!("lookup body is not JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| StoreError::Decode("lookup body is not a JSON object".into()))?;
    match obj.get(MATCH_KEY) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(name)) => Ok(Some(name.clone())),
        Some(other) => Err(StoreError::Decode(format!(
            "{MATCH_KEY} is not a string: {other}"
        ))),
    }
}

/// Split a listing body into stored names, one per line.
pub fn parse_listing(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

impl RemoteStore for ApiClient {
    fn find_match(&self, digest: &ContentDigest) -> Result<Option<String>, StoreError> {
        let url = self.endpoint(&["findMatchingFile"]);
        debug!(digest = digest.short(), "lookup");
        let res = self
            .client
            .get(url)
            .query(&[("hash", digest.as_str())])
            .send()?;
        parse_lookup(&drain(res)?)
    }

    fn upload(&self, path: &Path, name: &str, digest: &ContentDigest) -> Result<(), StoreError> {
        let form = self.upload_form(path, name, digest)?;
        debug!(name, digest = digest.short(), "upload");
        let res = self
            .client
            .post(self.endpoint(&["upload"]))
            .multipart(form)
            .send()?;
        drain(res).map(|_| ())
    }

    fn copy(&self, src: &str, dest: &str, digest: &ContentDigest) -> Result<(), StoreError> {
        debug!(src, dest, "copy");
        let res = self
            .client
            .get(self.endpoint(&["copyFile"]))
            .query(&[("src", src), ("dest", dest), ("hashstring", digest.as_str())])
            .send()?;
        drain(res).map(|_| ())
    }

    fn update(&self, path: &Path, name: &str, digest: &ContentDigest) -> Result<(), StoreError> {
        let form = self.upload_form(path, name, digest)?;
        debug!(name, digest = digest.short(), "update");
        let res = self
            .client
            .post(self.endpoint(&["update"]))
            .multipart(form)
            .send()?;
        drain(res).map(|_| ())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        debug!(name, "delete");
        let res = self.client.delete(self.endpoint(&["delete", name])).send()?;
        drain(res).map(|_| ())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        debug!("list");
        let res = self.client.get(self.endpoint(&["list"])).send()?;
        Ok(parse_listing(&drain(res)?))
    }
}

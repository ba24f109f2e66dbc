// Client configuration. Values come from built-in defaults, then the
// optional `~/.filestore/config.json`, then the `FILESTORE_URL`
// environment variable, and finally command-line flags (applied by
// `main`). The resolved struct is handed to `ApiClient::new` and the
// batch driver; nothing reads a global base address.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable that overrides the store address.
pub const URL_ENV: &str = "FILESTORE_URL";

/// Upper bound for `--jobs`.
pub const MAX_JOBS: usize = 8;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Base address of the remote store, without trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Attempts per remote call, the first one included (1 means no retry).
    pub max_attempts: usize,
    /// Base delay between attempts; attempt `n` waits `n * backoff_ms`.
    pub backoff_ms: u64,
    /// Worker threads used by `add`.
    pub jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "http://localhost:8080".into(),
            timeout_secs: 30,
            max_attempts: 1,
            backoff_ms: 200,
            jobs: 1,
        }
    }
}

impl Config {
    /// `~/.filestore/config.json`, or `None` when no home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".filestore").join("config.json"))
    }

    /// Read a config file that must exist.
    pub fn read_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: Config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg.normalized())
    }

    /// Read a config file, treating a missing file as the defaults. A file
    /// that exists but does not parse is still an error so typos are not
    /// ignored.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        Config::read_file(path)
    }

    /// Defaults, then the config file, then the process environment. An
    /// explicit `path` must exist; only the default location may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match (path, Config::default_path()) {
            (Some(p), _) => Config::read_file(p)?,
            (None, Some(p)) => Config::load_from(&p)?,
            (None, None) => Config::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Apply environment overrides through `lookup` so tests can supply
    /// their own variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        *self = std::mem::take(self).normalized();
    }

    /// Clamp numeric fields into their usable ranges and strip the trailing
    /// slash from the base address so endpoint joins stay predictable.
    pub fn normalized(mut self) -> Self {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        self.max_attempts = self.max_attempts.max(1);
        self.jobs = self.jobs.clamp(1, MAX_JOBS);
        self.timeout_secs = self.timeout_secs.max(1);
        self
    }
}

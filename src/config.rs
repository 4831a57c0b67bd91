use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::retry::RetryPolicy;

/// Startup configuration for the notes server.
///
/// Values come from the environment by default. Setting `CONFIG_FILE`
/// switches to a YAML file; any field it leaves out keeps its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bind address, `host:port`
    pub listen_addr: String,
    /// Directory holding one sub-directory per repo
    pub notes_root: PathBuf,
    /// Directory holding the client's static assets
    pub static_root: PathBuf,
    /// Directory holding `cert.pem` and `key.pem`
    pub cert_dir: PathBuf,
    pub idle_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub handshake_timeout_secs: u64,
    pub read_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
            notes_root: PathBuf::from("notes"),
            static_root: PathBuf::from("assets"),
            cert_dir: PathBuf::from("cert"),
            idle_timeout_secs: 5,
            poll_interval_ms: 1000,
            handshake_timeout_secs: 10,
            read_retries: 5,
            retry_backoff_ms: 10,
        }
    }
}

impl Config {
    /// Loads the configuration from `CONFIG_FILE` if set, else from the environment.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::from_yaml_file(Path::new(&path)),
            Err(_) => Ok(Self::from_lookup(|key| std::env::var(key).ok())),
        }
    }

    /// Builds a configuration from a key lookup, falling back to defaults.
    ///
    /// Unparseable numeric values are ignored rather than rejected.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(addr) = lookup("LISTEN") {
            cfg.listen_addr = addr;
        }
        if let Some(root) = lookup("NOTES_ROOT") {
            cfg.notes_root = PathBuf::from(root);
        }
        if let Some(root) = lookup("STATIC_ROOT") {
            cfg.static_root = PathBuf::from(root);
        }
        if let Some(dir) = lookup("CERT_DIR") {
            cfg.cert_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("IDLE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            cfg.idle_timeout_secs = secs;
        }

        cfg
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("Invalid YAML configuration")
    }

    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    pub fn cert_path(&self) -> PathBuf {
        self.cert_dir.join("cert.pem")
    }

    pub fn key_path(&self) -> PathBuf {
        self.cert_dir.join("key.pem")
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Retry policy for reads inside one request. Each read waits at most
    /// one poll interval.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.read_retries, Duration::from_millis(self.retry_backoff_ms))
            .with_read_timeout(self.poll_interval())
    }
}

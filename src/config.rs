use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::server::app::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_REQUEST_BYTES};

/// Config file read when `TETHER_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "tether.yaml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Seconds a connection may spend on one request; 0 disables the deadline.
    pub idle_timeout_secs: u64,
    pub max_request_bytes: usize,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            static_files: StaticFilesConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            idle_timeout_secs: 10,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("static"),
        }
    }
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Config {
    /// Loads the YAML file named by `TETHER_CONFIG` (or `tether.yaml` if it
    /// exists), then applies the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("TETHER_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH)?,
            Err(_) => Self::default(),
        };

        if let Ok(addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::request::RequestQueueOptions;
use crate::strategy::StrategyKind;
use crate::transport::CurlOptions;

/// Queue behaviour (`[queue]` in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Scheduling strategy: "parallel", "sequential" or "priority".
    pub strategy: StrategyKind,
    /// Fixed delay in milliseconds before a transiently failed request is retried.
    pub retry_timeout_ms: u64,
    /// Maximum attempts per request, including the first.
    pub max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Priority,
            retry_timeout_ms: 1000,
            max_retries: 300,
        }
    }
}

impl QueueConfig {
    pub fn to_options(&self) -> RequestQueueOptions {
        RequestQueueOptions {
            strategy: self.strategy,
            retry_timeout: Duration::from_millis(self.retry_timeout_ms),
            max_retries: self.max_retries,
            ..RequestQueueOptions::default()
        }
    }
}

/// Transport settings (optional `[transport]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    /// Total time allowed per request.
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 60,
            user_agent: None,
        }
    }
}

impl TransportConfig {
    pub fn to_options(&self) -> CurlOptions {
        CurlOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Global configuration loaded from `~/.config/rqueue/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RqueueConfig {
    #[serde(default)]
    pub queue: QueueConfig,
    /// Optional transport tuning; if missing, built-in defaults are used.
    #[serde(default)]
    pub transport: Option<TransportConfig>,
}

impl RqueueConfig {
    pub fn transport_options(&self) -> CurlOptions {
        self.transport.clone().unwrap_or_default().to_options()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rqueue")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RqueueConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<RqueueConfig> {
    if !path.exists() {
        let default_cfg = RqueueConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: RqueueConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

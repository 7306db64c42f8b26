//! Server configuration.

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base directory holding one subdirectory per team.
    #[serde(default = "default_teams_dir")]
    pub teams_dir: PathBuf,
    /// Minimum interval between persistence flushes for one board.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Interval of the idle-session eviction sweep.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Client timeout handed to the synchronization engine.
    #[serde(default = "default_client_timeout_ms")]
    pub client_timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_teams_dir() -> PathBuf {
    PathBuf::from("./teams")
}

fn default_flush_interval_ms() -> u64 {
    1000
}

fn default_sweep_interval_ms() -> u64 {
    1000
}

fn default_client_timeout_ms() -> u64 {
    30_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            teams_dir: default_teams_dir(),
            flush_interval_ms: default_flush_interval_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            client_timeout_ms: default_client_timeout_ms(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from the default location (config/default.toml) or fall
    /// back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("config/default.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }
        Ok(Config::default())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout_ms)
    }
}

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ReverbError};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReverbConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8090".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Upper bound on a single cache get/set, so a slow backend cannot
    /// stall the request path. A timeout counts as a persistence failure.
    pub op_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { op_timeout_ms: 2000 }
    }
}

impl CacheConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

pub fn load_config(path: &Path) -> Result<ReverbConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ReverbError::Config(format!("Failed to read config {}: {e}", path.display()))
    })?;
    let config: ReverbConfig = toml::from_str(&content).map_err(|e| {
        ReverbError::Config(format!("Failed to parse config {}: {e}", path.display()))
    })?;
    Ok(config)
}

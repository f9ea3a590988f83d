use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// On-disk application settings. Unknown or missing fields fall back to
/// their defaults, so older config files keep working after upgrades.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Config {
    /// Model used for all content generation calls.
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-subscriber buffer for live generation events.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model: default_model(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_event_buffer_size() -> usize {
    256
}

/// Read the config file, falling back to defaults when it is missing or
/// unparseable. A missing file is written back so the user has something
/// to edit.
pub async fn load_config_from_file(path: &Path) -> Config {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    "Failed to parse config at {}, using defaults: {}",
                    path.display(),
                    err
                );
                Config::default()
            }
        },
        Err(_) => {
            let config = Config::default();
            if let Err(err) = save_config_to_file(&config, path).await {
                tracing::warn!(
                    "Failed to write default config to {}: {}",
                    path.display(),
                    err
                );
            }
            config
        }
    }
}

pub async fn save_config_to_file(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

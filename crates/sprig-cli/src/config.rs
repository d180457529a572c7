//! CLI configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sprig_core::limits::MAX_TRAVERSAL_NODES;
use sprig_core::Strategy;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SPRIG_CONFIG";

/// Get default config directory
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sprig")
}

/// Location of the config file
pub fn config_file_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => PathBuf::from(path),
        None => default_config_dir().join("config.toml"),
    }
}

/// Configuration for the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default output format (table, json)
    pub format: String,
    /// Descendant expansion order
    pub strategy: Strategy,
    /// Nodes visited per traversal before giving up
    pub node_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: "table".to_string(),
            strategy: Strategy::BreadthFirst,
            node_limit: MAX_TRAVERSAL_NODES,
        }
    }
}

impl Config {
    /// Load the config file, falling back to defaults
    pub fn load() -> Self {
        let path = config_file_path();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => {
                tracing::debug!("No config file at {:?}, using defaults", path);
                return Self::default();
            }
        };

        match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring invalid config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_file_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        &["format", "strategy", "node_limit"]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "format" => Some(self.format.clone()),
            "strategy" => Some(strategy_name(self.strategy).to_string()),
            "node_limit" => Some(self.node_limit.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "format" => match value {
                "table" | "json" => self.format = value.to_string(),
                _ => anyhow::bail!("Invalid format '{}': expected table or json", value),
            },
            "strategy" => {
                self.strategy = match value {
                    "bfs" | "breadthfirst" => Strategy::BreadthFirst,
                    "dfs" | "depthfirst" => Strategy::DepthFirst,
                    _ => anyhow::bail!("Invalid strategy '{}': expected bfs or dfs", value),
                }
            }
            "node_limit" => {
                let limit: usize = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid node_limit '{}'", value))?;
                if limit == 0 {
                    anyhow::bail!("node_limit must be positive");
                }
                self.node_limit = limit;
            }
            _ => anyhow::bail!(
                "Unknown config key: {} (available: {})",
                key,
                Self::keys().join(", ")
            ),
        }
        Ok(())
    }
}

fn strategy_name(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::BreadthFirst => "bfs",
        Strategy::DepthFirst => "dfs",
    }
}

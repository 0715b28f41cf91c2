//! Configuration module for botflow
//!
//! This module handles:
//! - Application configuration (executor address, polling cadence, logging)
//! - Workflow files (`.botflow.json`) holding a saved graph
//!
//! # Config Location
//!
//! The config file lives in the platform-appropriate config directory:
//! - **Linux**: `~/.config/dev.botflow.botflow/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.botflow.botflow/config.toml`
//! - **Windows**: `%APPDATA%\dev.botflow.botflow\config.toml`
//!
//! # Example
//!
//! ```ignore
//! use botflow::config::{AppConfig, WorkflowFile};
//!
//! let config = AppConfig::load_or_default();
//! let workflow = WorkflowFile::load("pick_and_place.botflow.json")?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{BotflowError, Result};
use crate::graph::{Graph, GraphSnapshot, LoadReport, NodeCatalog};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.botflow.botflow";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

// ==================== Config Directory ====================

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Ensure the config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().ok_or_else(|| {
        BotflowError::Config("Could not determine config directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            BotflowError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Persistent application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub executor: ExecutorSettings,

    #[serde(default)]
    pub polling: PollingSettings,

    #[serde(default)]
    pub continuous: ContinuousSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Load config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BotflowError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| BotflowError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load config from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path().filter(|p| p.exists()) else {
            return Self::default();
        };
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BotflowError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| BotflowError::Config(format!("Failed to write config: {}", e)))
    }

    /// Save config to the default location
    pub fn save_default(&self) -> Result<PathBuf> {
        let path = ensure_config_dir()?.join(CONFIG_FILE);
        self.save(&path)?;
        Ok(path)
    }
}

// ==================== Workflow File ====================

/// A saved graph on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFile {
    /// Workflow file format version for future compatibility
    #[serde(default = "default_workflow_version")]
    pub version: u32,

    /// Workflow name
    #[serde(default)]
    pub name: String,

    /// The saved graph
    #[serde(default)]
    pub graph: GraphSnapshot,
}

fn default_workflow_version() -> u32 {
    1
}

impl WorkflowFile {
    pub fn new(name: impl Into<String>, graph: &Graph) -> Self {
        Self {
            version: 1,
            name: name.into(),
            graph: graph.to_snapshot(),
        }
    }

    /// Load a workflow file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BotflowError::Config(format!("Failed to read workflow {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| BotflowError::Config(format!("Failed to parse workflow: {}", e)))
    }

    /// Save the workflow as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| BotflowError::Config(format!("Failed to write workflow: {}", e)))
    }

    /// Rebuild the graph against `catalog`
    pub fn to_graph(&self, catalog: &NodeCatalog) -> Result<(Graph, LoadReport)> {
        Ok(Graph::from_snapshot(&self.graph, catalog)?)
    }
}

//! Configuration schema and loader with dual-location support
//!
//! Project-level config (./.cairn/cairn.toml) overrides user-level config
//! (~/.cairn/cairn.toml), which overrides built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Main cairn configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CairnConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// UI configuration
    #[serde(default)]
    pub ui: UiConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the scoped checkpoint tree
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Directory holding the global registry
    #[serde(default = "default_global_dir")]
    pub global_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            global_dir: default_global_dir(),
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

fn cairn_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".cairn")
}

fn default_base_dir() -> PathBuf {
    cairn_home().join("checkpoints")
}

fn default_global_dir() -> PathBuf {
    cairn_home().join("global-checkpoints")
}

impl CairnConfig {
    /// Merge another config into this one (other takes precedence)
    ///
    /// Simply replaces all sections from other, since serde already fills in
    /// defaults for missing fields. The loader handles priority: defaults →
    /// user → project
    pub fn merge(&mut self, other: CairnConfig) {
        self.storage = other.storage;
        self.ui = other.ui;
    }
}

/// Configuration loader that handles both user and project configs
pub struct ConfigLoader {
    user_config_path: PathBuf,
    project_config_path: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self {
            user_config_path: Self::user_config_path(),
            project_config_path: Self::project_config_path(),
        }
    }

    /// Get user-level config path (~/.cairn/cairn.toml)
    fn user_config_path() -> PathBuf {
        cairn_home().join("cairn.toml")
    }

    /// Get project-level config path (./.cairn/cairn.toml)
    fn project_config_path() -> PathBuf {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".cairn")
            .join("cairn.toml")
    }

    /// Load configuration from both locations with project taking precedence
    pub async fn load(&self) -> Result<CairnConfig> {
        let mut config = CairnConfig::default();

        if let Ok(user_config) = self.load_from_path(&self.user_config_path).await {
            config.merge(user_config);
        }

        if let Ok(project_config) = self.load_from_path(&self.project_config_path).await {
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    async fn load_from_path(&self, path: &PathBuf) -> Result<CairnConfig> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CairnConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get user config path
    pub fn get_user_config_path(&self) -> &PathBuf {
        &self.user_config_path
    }

    /// Get project config path
    pub fn get_project_config_path(&self) -> &PathBuf {
        &self.project_config_path
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize config for a new project (creates .cairn directory and config file)
pub async fn init_project_config() -> Result<PathBuf> {
    let project_cairn_dir = std::env::current_dir()
        .context("Failed to get current directory")?
        .join(".cairn");

    fs::create_dir_all(&project_cairn_dir)
        .await
        .with_context(|| format!("Failed to create {}", project_cairn_dir.display()))?;

    let config_path = project_cairn_dir.join("cairn.toml");
    create_default_config_file(&config_path).await?;

    Ok(config_path)
}

/// Create a default config file at the specified path
async fn create_default_config_file(path: &PathBuf) -> Result<()> {
    let default_config = r#"# cairn Configuration File
#
# Project-level config (./.cairn/cairn.toml) overrides user-level config
# (~/.cairn/cairn.toml).

[storage]
# Paths default to ~/.cairn/checkpoints and ~/.cairn/global-checkpoints
# when left unset.
# base_dir = "/path/to/checkpoints"
# global_dir = "/path/to/global-checkpoints"

[ui]
log_level = "info"            # trace, debug, info, warn, error
"#;

    fs::write(path, default_config)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

// ABOUTME: Configuration types and parsing for layerci.yml.
// ABOUTME: Handles YAML parsing, discovery, and defaults for the built-in layer stack.

mod dashboard;
mod deserialize;
mod env_value;
mod init;

pub use dashboard::{AuxiliaryStage, DashboardConfig};
pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;

use crate::error::{Error, Result};
use crate::registry::{EngineKind, LayerRegistry};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "layerci.yml";
pub const CONFIG_FILENAME_ALT: &str = "layerci.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".layerci/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(
        default = "LayerRegistry::builtin",
        deserialize_with = "deserialize::deserialize_registry"
    )]
    pub layers: LayerRegistry,

    #[serde(default = "default_trunk_branch")]
    pub trunk_branch: String,

    /// Binary overrides per engine, e.g. a pinned terraform path.
    #[serde(default)]
    pub engines: HashMap<EngineKind, PathBuf>,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Extra legacy phrases accepted in front of slash commands.
    #[serde(default)]
    pub aliases: Vec<AliasConfig>,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub workflows: WorkflowConfig,

    #[serde(default = "default_status_context")]
    pub status_context: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_engine_timeout", with = "humantime_serde")]
    pub engine: Duration,

    #[serde(default = "default_api_timeout", with = "humantime_serde")]
    pub api: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            engine: default_engine_timeout(),
            api: default_api_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AliasConfig {
    pub phrase: String,
    pub command: String,
}

/// Workflow files dispatched by the auxiliary comment commands.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_e2e_workflow")]
    pub e2e: Option<String>,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(default)]
    pub review: Option<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            e2e: default_e2e_workflow(),
            health: None,
            review: None,
        }
    }
}

fn default_trunk_branch() -> String {
    "main".to_string()
}

fn default_status_context() -> String {
    "CI".to_string()
}

fn default_engine_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_e2e_workflow() -> Option<String> {
    Some("e2e-tests.yml".to_string())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layers: LayerRegistry::builtin(),
            trunk_branch: default_trunk_branch(),
            engines: HashMap::new(),
            timeouts: TimeoutConfig::default(),
            aliases: Vec::new(),
            dashboard: DashboardConfig::default(),
            workflows: WorkflowConfig::default(),
            status_context: default_status_context(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Find a config file in `dir`, falling back to built-in defaults.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("Loading configuration from {}", path.display());
                return Self::load(path);
            }
        }

        tracing::debug!("No configuration file in {}, using defaults", dir.display());
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.trunk_branch.trim().is_empty() {
            return Err(Error::InvalidConfig("trunk_branch cannot be empty".to_string()));
        }

        for alias in &self.aliases {
            if !alias.command.starts_with('/') {
                return Err(Error::InvalidConfig(format!(
                    "alias \"{}\" must map to a slash command, got \"{}\"",
                    alias.phrase, alias.command
                )));
            }
        }

        self.dashboard.validate(&self.layers)
    }
}

//! Engine configuration loaded from TOML files
//!
//! Hosts that keep their storage layout in configuration rather than code
//! can describe it here; every field has a sensible default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to load an engine configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Storage layout and behaviour toggles for the trigger engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory for persisted action files, one per campaign
    #[serde(default = "default_actions_dir")]
    pub actions_dir: PathBuf,

    /// File holding the per-variant execution counters
    #[serde(default = "default_counts_file")]
    pub counts_file: PathBuf,

    /// File backing the default preference store
    #[serde(default = "default_preferences_file")]
    pub preferences_file: PathBuf,

    /// Whether an action run keeps going after the first claimed trigger
    #[serde(default)]
    pub multiple_actions_for_event_trigger_enabled: bool,
}

fn default_actions_dir() -> PathBuf {
    PathBuf::from("actions")
}

fn default_counts_file() -> PathBuf {
    PathBuf::from("eventTrigger/counts")
}

fn default_preferences_file() -> PathBuf {
    PathBuf::from("preferences")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            actions_dir: default_actions_dir(),
            counts_file: default_counts_file(),
            preferences_file: default_preferences_file(),
            multiple_actions_for_event_trigger_enabled: false,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    /// Resolve the configured paths against a base directory, typically
    /// the host's persistent-data location
    pub fn rooted_at(mut self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        self.actions_dir = base.join(&self.actions_dir);
        self.counts_file = base.join(&self.counts_file);
        self.preferences_file = base.join(&self.preferences_file);
        self
    }
}

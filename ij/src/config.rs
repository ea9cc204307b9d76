//! Configuration for the injector

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{InjectError, InjectResult};
use crate::events::EventNames;

/// Default capacity of the event broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Largest accepted event channel capacity
pub const MAX_EVENT_CAPACITY: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectorConfig {
    /// Event name emitted on first publication of a key
    #[serde(default = "default_ready_event_name")]
    pub ready_event_name: String,

    /// Reserved event name for removals (never emitted)
    #[serde(default = "default_remove_event_name")]
    pub remove_event_name: String,

    /// Event name emitted when a key's value is overwritten
    #[serde(default = "default_replace_event_name", alias = "evict_event_name")]
    pub replace_event_name: String,

    /// Buffered events per subscriber before the oldest are dropped
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Log level for the `ij` binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

fn default_ready_event_name() -> String {
    "service-ready".to_string()
}

fn default_remove_event_name() -> String {
    "service-remove".to_string()
}

fn default_replace_event_name() -> String {
    "service-replace".to_string()
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            ready_event_name: default_ready_event_name(),
            remove_event_name: default_remove_event_name(),
            replace_event_name: default_replace_event_name(),
            event_capacity: default_event_capacity(),
            log_level: None,
        }
    }
}

impl InjectorConfig {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            debug!(path = %config_path.display(), "InjectorConfig::load: explicit path");
            return Self::read(config_path);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("injector").join("config.yml")),
            Some(PathBuf::from("injector.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "InjectorConfig::load: found default config");
                return Self::read(path);
            }
        }

        Ok(Self::default())
    }

    fn read(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read config: {}", path.display()))?;
        let config: InjectorConfig =
            serde_yaml::from_str(&content).context(format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject blank event names and a channel capacity outside 1..=MAX_EVENT_CAPACITY
    pub fn validate(&self) -> InjectResult<()> {
        let fields = [
            ("ready_event_name", &self.ready_event_name),
            ("remove_event_name", &self.remove_event_name),
            ("replace_event_name", &self.replace_event_name),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(InjectError::InvalidEventName {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
        }
        if !(1..=MAX_EVENT_CAPACITY).contains(&self.event_capacity) {
            return Err(InjectError::InvalidCapacity {
                capacity: self.event_capacity,
                max: MAX_EVENT_CAPACITY,
            });
        }
        Ok(())
    }

    pub fn event_names(&self) -> EventNames {
        EventNames {
            ready: self.ready_event_name.clone(),
            remove: self.remove_event_name.clone(),
            replace: self.replace_event_name.clone(),
        }
    }
}

//! CLI configuration loading and management.

use pledge_core::{DiagnosticsConfig, RuntimeConfig, SchedulerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full configuration for the `pledge` binary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PledgeConfig {
    /// Scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Unhandled-outcome reporting.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl PledgeConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: PledgeConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The part of the config the promise runtime consumes.
    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            scheduler: self.scheduler.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

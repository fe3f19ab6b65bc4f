//! Configuration module for tetherctl.
//!
//! Settings come from a TOML file and are overridden by command-line flags.
//! The bridge and host sections are passed through to `TetherConfig` and
//! `SimConfig` unchanged.

use dirs::{config_dir, home_dir};
use num_cpus::get as get_num_cpus;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tether_core::{PersistenceMode, TetherConfig};
use tether_sim::SimConfig;

use crate::error::{CtlError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "tetherctl.toml";

/// Fallback storm thread count when the CPU count does not fit.
const DEFAULT_THREAD_COUNT: usize = 2;

/// Application configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// Global verbose setting.
    #[serde(default)]
    pub verbose: bool,

    /// Storm scenario defaults.
    #[serde(default)]
    pub storm: StormConfig,

    /// Cycle scenario defaults.
    #[serde(default)]
    pub cycle: CycleConfig,

    /// Lifecycle scenario defaults.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Bridge settings.
    #[serde(default)]
    pub tether: TetherConfig,

    /// Simulated host settings.
    #[serde(default)]
    pub host: SimConfig,
}

/// Storm scenario configuration options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StormConfig {
    /// Number of threads hammering the object.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Acquire/release pairs per thread.
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Persistence mode of the stormed object.
    #[serde(default)]
    pub mode: PersistenceMode,

    /// Hold a keeper owner for the whole storm.
    #[serde(default)]
    pub hold: bool,
}

/// Cycle scenario configuration options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleConfig {
    /// Acquire/release/collect cycles to run.
    #[serde(default = "default_cycles")]
    pub cycles: usize,
}

/// Lifecycle scenario configuration options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LifecycleConfig {
    /// Concurrent owners acquired before the first release.
    #[serde(default = "default_owners")]
    pub owners: usize,

    /// Persistence mode of the object.
    #[serde(default = "default_lifecycle_mode")]
    pub mode: PersistenceMode,
}

fn default_threads() -> usize {
    match get_num_cpus() {
        0 => DEFAULT_THREAD_COUNT,
        n => n,
    }
}

fn default_iterations() -> usize {
    1000
}

fn default_cycles() -> usize {
    100
}

fn default_owners() -> usize {
    8
}

fn default_lifecycle_mode() -> PersistenceMode {
    PersistenceMode::Transient
}

impl Default for StormConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            iterations: default_iterations(),
            mode: PersistenceMode::Persistent,
            hold: false,
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycles: default_cycles(),
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            owners: default_owners(),
            mode: default_lifecycle_mode(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Searches for configuration in the following order:
    /// 1. Current directory
    /// 2. `~/.config/tetherctl/`
    /// 3. System configuration directory
    ///
    /// Returns the default configuration if no config file is found.
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CtlError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| CtlError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| CtlError::Config(format!("Failed to serialize configuration: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the bridge and host sections.
    pub fn validate(&self) -> Result<()> {
        self.tether
            .validate()
            .map_err(|e| CtlError::Config(e.to_string()))?;
        self.host
            .validate()
            .map_err(|e| CtlError::Config(e.to_string()))?;
        Ok(())
    }

    fn check_current_dir_config() -> Option<PathBuf> {
        let path = PathBuf::from(CONFIG_FILE_NAME);
        path.exists().then_some(path)
    }

    fn check_home_config() -> Option<PathBuf> {
        home_dir()
            .map(|dir| dir.join(".config").join("tetherctl").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn check_system_config() -> Option<PathBuf> {
        config_dir()
            .map(|dir| dir.join("tetherctl").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    /// Find the configuration file in standard locations.
    fn find_config_file() -> Option<PathBuf> {
        Self::check_current_dir_config()
            .or_else(Self::check_home_config)
            .or_else(Self::check_system_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config() -> Config {
        Config {
            verbose: true,
            storm: StormConfig {
                threads: 3,
                iterations: 50,
                mode: PersistenceMode::Transient,
                hold: true,
            },
            cycle: CycleConfig { cycles: 7 },
            lifecycle: LifecycleConfig {
                owners: 4,
                mode: PersistenceMode::Scoped,
            },
            tether: TetherConfig {
                trace_transitions: true,
                ..Default::default()
            },
            host: SimConfig {
                strict_pending_failure: false,
                collect_threshold: 16,
            },
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.verbose);
        assert!(config.storm.threads >= 1);
        assert_eq!(config.storm.iterations, 1000);
        assert_eq!(config.storm.mode, PersistenceMode::Persistent);
        assert_eq!(config.cycle.cycles, 100);
        assert_eq!(config.lifecycle.mode, PersistenceMode::Transient);
        assert!(config.host.strict_pending_failure);
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tetherctl.toml");

        let original = create_test_config();
        original.save_to_path(&config_path).unwrap();

        let loaded = Config::load_from_path(&config_path).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tetherctl.toml");
        std::fs::write(&config_path, "[storm]\nmode = \"scoped\"\n").unwrap();

        let config = Config::load_from_path(&config_path).unwrap();
        assert_eq!(config.storm.mode, PersistenceMode::Scoped);
        assert_eq!(config.storm.iterations, 1000);
        assert_eq!(config.tether.retain_limit, tether_core::DEFAULT_RETAIN_LIMIT);
    }

    #[test]
    fn test_invalid_bridge_section_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tetherctl.toml");
        std::fs::write(&config_path, "[tether]\nretain_limit = 0\n").unwrap();

        assert!(matches!(
            Config::load_from_path(&config_path),
            Err(CtlError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_nonexistent_path() {
        let result = Config::load_from_path(Path::new("/nonexistent/path/tetherctl.toml"));
        assert!(result.is_err());
    }
}

//! Run configuration loading.

use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

/// Options that shape a grouping run but are not part of the scene.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GroupingConfig {
    /// Shuffle the endpoints with this seed before picking transmitters.
    pub shuffle_seed: Option<u64>,
    /// Delay (ms) before the sidelink bearers of the groups are activated.
    pub bearer_start_ms: u64,
    /// Multicast address of the first group; later groups count up from it.
    pub multicast_base: Ipv4Addr,
    /// Write the group table here in addition to the plain listing.
    pub table_output: Option<PathBuf>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            shuffle_seed: None,
            bearer_start_ms: 2000,
            multicast_base: Ipv4Addr::new(225, 0, 0, 1),
            table_output: None,
        }
    }
}

impl GroupingConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the config.toml file
    ///
    /// # Returns
    /// * `Ok(GroupingConfig)` if the file was successfully loaded and parsed
    /// * `Err(String)` with a descriptive error message otherwise
    pub fn load(config_path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(config_path).map_err(|e| format!("Failed to read config file: {}", e))?;

        let mut config: Self = toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))?;

        // Relative output paths are relative to the config file, not the working directory
        if let (Some(table), Some(dir)) = (config.table_output.as_mut(), config_path.parent()) {
            if table.is_relative() {
                *table = dir.join(&*table);
            }
        }
        Ok(config)
    }

    /// Load the configuration if the file exists, defaults otherwise.
    pub fn load_or_default(config_path: &Path) -> Result<Self, String> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            log::info!("No config file at {}, using defaults", config_path.display());
            Ok(Self::default())
        }
    }

    /// Derive the config path from a scene file path.
    ///
    /// Replaces the scene filename with "config.toml" in the same directory.
    pub fn config_path_from_scene(scene_path: &Path) -> PathBuf {
        scene_path.parent().unwrap_or(Path::new(".")).join("config.toml")
    }
}

//! Preset loader.
//!
//! Loads physics constants, table dimensions and rack layouts from YAML
//! files, so different cloths, tables and drills can be tried without
//! recompiling.
//!
//! ## Directory Structure
//!
//! ```text
//! presets/
//! ├── physics/
//! │   ├── standard.yaml
//! │   └── fast_cloth.yaml
//! ├── tables/
//! │   ├── nine_foot.yaml
//! │   └── seven_foot.yaml
//! └── racks/
//!     ├── eight_ball.yaml
//!     └── ...
//! ```
//!
//! Every preset is validated on load; a file that parses but holds
//! out-of-range values is rejected like a malformed one.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::rack::Rack;
use crate::table::TableSpec;

/// Preset loader with configurable base directory.
#[derive(Debug, Clone)]
pub struct PresetLoader {
    base_path: PathBuf,
}

impl PresetLoader {
    /// Create a new loader with the given base path.
    ///
    /// The base path should contain `physics/`, `tables/`, and `racks/` subdirectories.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Load physics constants by name (without .yaml extension).
    ///
    /// # Example
    /// ```ignore
    /// let loader = PresetLoader::new("presets");
    /// let config = loader.load_config("standard")?;
    /// ```
    pub fn load_config(&self, name: &str) -> Result<SimulationConfig, ConfigError> {
        let config: SimulationConfig = self.load("physics", name)?;
        config.validate()?;
        Ok(config)
    }

    /// Load table dimensions by name.
    pub fn load_table(&self, name: &str) -> Result<TableSpec, ConfigError> {
        let spec: TableSpec = self.load("tables", name)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Load a rack by name.
    ///
    /// Placement is checked against a table when the rack is laid out.
    pub fn load_rack(&self, name: &str) -> Result<Rack, ConfigError> {
        self.load("racks", name)
    }

    /// List all available physics presets.
    pub fn list_configs(&self) -> Result<Vec<String>, ConfigError> {
        self.list_presets("physics")
    }

    /// List all available tables.
    pub fn list_tables(&self) -> Result<Vec<String>, ConfigError> {
        self.list_presets("tables")
    }

    /// List all available racks.
    pub fn list_racks(&self) -> Result<Vec<String>, ConfigError> {
        self.list_presets("racks")
    }

    fn load<T: DeserializeOwned>(&self, subdir: &str, name: &str) -> Result<T, ConfigError> {
        let path = self.base_path.join(subdir).join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(ConfigError::NotFound(name.to_string()));
        }
        debug!(path = %path.display(), "loading preset");
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    fn list_presets(&self, subdir: &str) -> Result<Vec<String>, ConfigError> {
        let path = self.base_path.join(subdir);
        if !path.exists() {
            return Ok(vec![]);
        }

        let io_error = |source: std::io::Error| ConfigError::Io {
            path: path.clone(),
            source,
        };
        let mut names = Vec::new();
        for entry in fs::read_dir(&path).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if name.ends_with(".yaml") {
                names.push(name.trim_end_matches(".yaml").to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableGeometry;
    use std::env;

    fn get_presets_path() -> PathBuf {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(manifest_dir).join("..").join("presets")
    }

    #[test]
    fn test_load_standard_config() {
        let loader = PresetLoader::new(get_presets_path());
        let result = loader.load_config("standard");

        assert!(result.is_ok(), "Should load standard: {:?}", result.err());
        assert_eq!(result.unwrap(), SimulationConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let loader = PresetLoader::new(get_presets_path());
        let config = loader.load_config("fast_cloth").unwrap();

        assert!(config.sliding_friction < SimulationConfig::default().sliding_friction);
        assert_eq!(config.gravity, 9.81);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let loader = PresetLoader::new(get_presets_path());
        let result = loader.load_config("nonexistent_cloth_xyz");

        match result {
            Err(ConfigError::NotFound(name)) => {
                assert_eq!(name, "nonexistent_cloth_xyz");
            }
            other => panic!("Expected NotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_tables() {
        let loader = PresetLoader::new(get_presets_path());
        let nine = loader.load_table("nine_foot").unwrap();
        assert_eq!(nine, TableSpec::nine_foot());

        let seven = loader.load_table("seven_foot").unwrap();
        assert!(seven.length < nine.length);
        assert!(TableGeometry::from_spec(&seven, 0.7).is_ok());
    }

    #[test]
    fn test_load_racks_lay_out() {
        let loader = PresetLoader::new(get_presets_path());
        let table = TableGeometry::from_spec(&TableSpec::nine_foot(), 0.7).unwrap();
        for name in loader.list_racks().unwrap() {
            let rack = loader.load_rack(&name).unwrap();
            assert!(rack.layout(&table).is_ok(), "Rack {} should fit the table", name);
        }
    }

    #[test]
    fn test_list_presets() {
        let loader = PresetLoader::new(get_presets_path());

        let configs = loader.list_configs().unwrap();
        assert!(configs.contains(&"standard".to_string()));

        let racks = loader.list_racks().unwrap();
        assert!(racks.contains(&"eight_ball".to_string()));
        assert!(racks.contains(&"nine_ball".to_string()));
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let loader = PresetLoader::new("/nonexistent/presets");
        assert!(loader.list_tables().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<SimulationConfig, _> = serde_yaml::from_str("gravity: 9.81\nspeed_of_light: 1\n");
        assert!(result.is_err());
    }
}

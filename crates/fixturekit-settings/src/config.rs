//! Planner configuration.
//!
//! Configuration is organized into sections:
//! - Tolerances (angles, distances, areas)
//! - Vice geometry and the available parallel plates
//! - The tool library
//!
//! Files are JSON or TOML, chosen by extension.

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use fixturekit_core::Tolerances;
use fixturekit_fixtures::{PlanOptions, Tool, Vice, ViceSetup};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Format from the file extension
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(ConfigFormat::Json),
            Some("toml") => Ok(ConfigFormat::Toml),
            other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string())),
        }
    }
}

/// Vice geometry and plates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViceSettings {
    /// Widest part span the jaws accept
    pub max_opening: f64,
    /// Jaw height above the vice floor
    pub jaw_height: f64,
    /// Vice floor height above the table
    pub base_height: f64,
    /// Parallel plate heights available
    pub plates: Vec<f64>,
    /// Minimum part height held between the jaws
    pub min_grip_depth: f64,
    /// Minimum part height above the jaw top
    pub min_protrusion: f64,
}

impl Default for ViceSettings {
    fn default() -> Self {
        Self {
            max_opening: 6.0,
            jaw_height: 1.75,
            base_height: 0.0,
            plates: vec![0.5, 1.0],
            min_grip_depth: 0.1,
            min_protrusion: 0.1,
        }
    }
}

impl ViceSettings {
    pub fn to_vice_setup(&self) -> ViceSetup {
        ViceSetup::new(
            Vice::new(self.max_opening, self.jaw_height, self.base_height),
            self.plates.iter().copied(),
        )
        .with_min_grip_depth(self.min_grip_depth)
        .with_min_protrusion(self.min_protrusion)
    }
}

/// One flat end mill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    pub name: String,
    pub diameter: f64,
    /// Length of the fluted section
    pub cutting_length: f64,
}

impl ToolSettings {
    pub fn new(name: impl Into<String>, diameter: f64, cutting_length: f64) -> Self {
        Self {
            name: name.into(),
            diameter,
            cutting_length,
        }
    }

    pub fn to_tool(&self) -> Tool {
        Tool::new(self.name.clone(), self.diameter, self.cutting_length)
    }
}

/// Complete planner configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub tolerances: Tolerances,
    pub vice: ViceSettings,
    pub tools: Vec<ToolSettings>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            vice: ViceSettings::default(),
            tools: vec![
                ToolSettings::new("1/2 flat end mill", 0.5, 1.25),
                ToolSettings::new("1/4 flat end mill", 0.25, 0.75),
                ToolSettings::new("1/8 flat end mill", 0.125, 0.5),
            ],
        }
    }
}

impl PlannerConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = match format {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        info!("Loaded planner config from {}", path.display());
        Ok(config)
    }

    /// Load the file if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;
        debug!("Saved planner config to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if !self.tolerances.is_valid() {
            return Err(ConfigError::ValueOutOfRange {
                key: "tolerances".to_string(),
                value: format!("{:?}", self.tolerances),
            }
            .into());
        }

        let vice = &self.vice;
        if !(vice.max_opening.is_finite() && vice.max_opening > 0.0) {
            return Err(SettingsError::invalid("vice.max_opening", "must be > 0"));
        }
        if !(vice.jaw_height.is_finite() && vice.jaw_height > 0.0) {
            return Err(SettingsError::invalid("vice.jaw_height", "must be > 0"));
        }
        if !(vice.base_height.is_finite() && vice.base_height >= 0.0) {
            return Err(SettingsError::invalid("vice.base_height", "must be >= 0"));
        }
        if let Some(plate) = vice
            .plates
            .iter()
            .find(|&&h| !(h.is_finite() && h > 0.0 && h < vice.jaw_height))
        {
            return Err(SettingsError::invalid(
                "vice.plates",
                format!("plate height {} must be > 0 and below the jaw height", plate),
            ));
        }
        if !(vice.min_grip_depth >= 0.0 && vice.min_protrusion >= 0.0) {
            return Err(SettingsError::invalid(
                "vice.min_grip_depth",
                "grip depth and protrusion must be >= 0",
            ));
        }

        if self.tools.is_empty() {
            return Err(SettingsError::invalid("tools", "at least one tool is required"));
        }
        for tool in &self.tools {
            if tool.name.trim().is_empty() {
                return Err(SettingsError::invalid("tools.name", "must not be empty"));
            }
            if !(tool.diameter.is_finite() && tool.diameter > 0.0) {
                return Err(SettingsError::invalid("tools.diameter", format!("{} must be > 0", tool.name)));
            }
            if !(tool.cutting_length.is_finite() && tool.cutting_length > 0.0) {
                return Err(SettingsError::invalid(
                    "tools.cutting_length",
                    format!("{} must be > 0", tool.name),
                ));
            }
        }
        Ok(())
    }

    /// Options for a planning run
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            tolerances: self.tolerances,
            vice: self.vice.to_vice_setup(),
            tools: self.tools.iter().map(ToolSettings::to_tool).collect(),
        }
    }
}

/// Default location of the user's config file
pub fn default_config_path() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join("fixturekit").join("config.toml"))
        .ok_or_else(|| SettingsError::ConfigDirectory("no config or home directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PlannerConfig::new();
        assert!(config.validate().is_ok());
        let options = config.plan_options();
        assert_eq!(options.tools.len(), 3);
        assert_eq!(options.vice.plates(), &[0.5, 1.0]);
        assert_eq!(options.vice.vice().jaw_height(), 1.75);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a/b.toml")).unwrap(), ConfigFormat::Toml);
        assert!(matches!(
            ConfigFormat::from_path(Path::new("a.yaml")),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"
        ));
        assert!(ConfigFormat::from_path(Path::new("config")).is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = PlannerConfig::default();
        config.vice.plates.push(2.0);
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidSetting { key, .. }) if key == "vice.plates"
        ));

        let mut config = PlannerConfig::default();
        config.tools.clear();
        assert!(config.validate().is_err());

        let mut config = PlannerConfig::default();
        config.tools[0].diameter = 0.0;
        assert!(config.validate().is_err());

        let mut config = PlannerConfig::default();
        config.tolerances.angle_deg = 60.0;
        assert!(matches!(config.validate(), Err(SettingsError::Config(_))));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: PlannerConfig = toml::from_str("[vice]\nmax_opening = 8.0\n").unwrap();
        assert_eq!(config.vice.max_opening, 8.0);
        assert_eq!(config.vice.jaw_height, 1.75);
        assert_eq!(config.tools.len(), 3);
        assert_eq!(config.tolerances, Tolerances::default());
    }
}

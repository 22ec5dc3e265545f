//! FixtureKit Settings Crate
//!
//! Handles planner configuration: tolerances, vice and plates, and the
//! tool library, persisted as JSON or TOML.

pub mod config;
pub mod error;

pub use config::{default_config_path, ConfigFormat, PlannerConfig, ToolSettings, ViceSettings};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

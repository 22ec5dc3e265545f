use fixturekit_settings::{PlannerConfig, SettingsError, ToolSettings};
use tempfile::TempDir;

#[test]
fn json_and_toml_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut config = PlannerConfig::default();
    config.vice.plates = vec![0.1, 0.3, 0.7];
    config.tools.push(ToolSettings::new("3/4 flat end mill", 0.75, 1.5));

    for name in ["planner.json", "nested/planner.toml"] {
        let path = dir.path().join(name);
        config.save_to_file(&path).unwrap();
        let loaded = PlannerConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("planner.yaml");
    let err = PlannerConfig::default().save_to_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::Config(_)));
    assert!(!path.exists());
}

#[test]
fn invalid_file_is_not_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("planner.json");
    std::fs::write(&path, r#"{ "vice": { "jaw_height": -1.0 } }"#).unwrap();
    let err = PlannerConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidSetting { .. }));

    std::fs::write(&path, "not json").unwrap();
    let err = PlannerConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::JsonError(_)));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = PlannerConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, PlannerConfig::default());
}

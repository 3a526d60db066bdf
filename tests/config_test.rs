use dtgrid::background::BackgroundMode;
use dtgrid::config::{AppConfig, ConfigManager};
use std::fs;
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");

    assert_eq!(config.server.url, "http://localhost:40000");
    assert_eq!(config.server.data_id, "1");
    assert_eq!(config.server.timeout_secs, 30);

    assert_eq!(config.display.page_size, 56);
    assert_eq!(config.display.max_column_width, Some(40));
    assert_eq!(config.display.min_column_width, 3);
    assert_eq!(config.display.table_cell_padding, 1);
    assert_eq!(config.display.max_cached_rows, 0);
    assert!(config.display.default_background.is_none());

    assert_eq!(config.performance.event_poll_interval_ms, 25);
    assert!(config.highlight.is_empty());
    assert!(!config.debug.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let config = AppConfig::load_from(&config_manager).unwrap();
    assert_eq!(config.display.page_size, 56);
    assert_eq!(config.server.url, "http://localhost:40000");
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let path = config_manager.write_default_config(false).unwrap();
    assert!(path.exists());

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("[server]"));
    assert!(content.contains("# page_size = 56"));
    assert!(content.contains("default_background"));

    // Everything is commented out, so loading it gives the defaults.
    let config = AppConfig::load_from(&config_manager).unwrap();
    assert_eq!(config.display.page_size, 56);
    assert_eq!(config.theme.colors.keybind_hints, AppConfig::default().theme.colors.keybind_hints);
}

#[test]
fn test_generate_config_refuses_to_overwrite() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.write_default_config(false).unwrap();

    let err = config_manager.write_default_config(false).unwrap_err();
    assert!(err.to_string().contains("already exists"), "got: {}", err);

    assert!(config_manager.write_default_config(true).is_ok());
}

#[test]
fn test_user_config_overrides_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(
        config_manager.config_path("config.toml"),
        r##"
[server]
url = "http://example.com:40000"
data_id = "7"

[display]
page_size = 100
max_cached_rows = 500
default_background = "outliers"

[highlight]
columns = ["price"]
greater_than = { value = 100.0, color = "#ffb2b2" }

[theme.colors]
cursor = "#303030"
"##,
    )
    .unwrap();

    let config = AppConfig::load_from(&config_manager).unwrap();
    assert_eq!(config.server.url, "http://example.com:40000");
    assert_eq!(config.server.data_id, "7");
    assert_eq!(config.server.timeout_secs, 30);
    assert_eq!(config.display.page_size, 100);
    assert_eq!(config.display.max_cached_rows, 500);
    assert_eq!(config.display.min_column_width, 3);
    assert_eq!(
        config.display.default_background,
        Some(BackgroundMode::Outliers)
    );
    assert_eq!(config.highlight.columns, vec!["price".to_string()]);
    assert_eq!(config.highlight.greater_than.as_ref().unwrap().value, 100.0);
    assert_eq!(config.theme.colors.cursor, "#303030");

    let options = config.display.grid_options();
    assert_eq!(options.page_size, 100);
    assert_eq!(options.sizing.max_width, Some(40));
}

#[test]
fn test_invalid_config_reports_path() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(
        config_manager.config_path("config.toml"),
        "[display]\npage_size = 0\n",
    )
    .unwrap();

    let err = AppConfig::load_from(&config_manager).unwrap_err().to_string();
    assert!(err.contains("config.toml"), "got: {}", err);
    assert!(err.contains("page_size"), "got: {}", err);
}

#[test]
fn test_unparseable_config_is_an_error() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(config_manager.config_path("config.toml"), "[display\n").unwrap();
    assert!(AppConfig::load_from(&config_manager).is_err());
}

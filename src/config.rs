use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use supports_color::Stream;

use crate::background::{BackgroundMode, RangeRules, Rgb};
use crate::sizing::SizingOptions;
use crate::store::GridOptions;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Default configuration as TOML with every field commented out, so
    /// defaults apply until the user uncomments a line.
    pub fn generate_default_config(&self) -> Result<String> {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        let comments = Self::collect_all_comments();
        Ok(Self::comment_all_fields(toml_str, comments))
    }

    fn collect_all_comments() -> HashMap<String, String> {
        let sections: &[(&str, &[(&str, &str)])] = &[
            ("", APP_COMMENTS),
            ("server", SERVER_COMMENTS),
            ("display", DISPLAY_COMMENTS),
            ("performance", PERFORMANCE_COMMENTS),
            ("highlight", HIGHLIGHT_COMMENTS),
            ("theme.colors", COLOR_COMMENTS),
            ("debug", DEBUG_COMMENTS),
        ];
        let mut comments = HashMap::new();
        for (section, fields) in sections {
            for (field, comment) in *fields {
                let key = if section.is_empty() {
                    field.to_string()
                } else {
                    format!("{}.{}", section, field)
                };
                comments.insert(key, comment.to_string());
            }
        }
        comments
    }

    /// Comment out all fields in TOML and add comments.
    /// Option fields that serialize to nothing are added back as `# field = null`.
    fn comment_all_fields(toml: String, comments: HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# dtgrid configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: std::collections::HashSet<String> = std::collections::HashSet::new();

        for line in toml.lines() {
            if let Some(section) = Self::extract_section_name(line) {
                current_section = section.clone();
                if let Some(header) = SECTION_HEADERS.iter().find(|(s, _)| *s == section) {
                    result.push_str(header.1);
                    result.push('\n');
                }
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = Self::extract_field_path(line, &current_section) {
                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen_fields.insert(field_path);
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Self::add_missing_option_fields(result, &comments, &seen_fields)
    }

    fn add_missing_option_fields(
        mut result: String,
        comments: &HashMap<String, String>,
        seen_fields: &std::collections::HashSet<String>,
    ) -> String {
        let option_fields = [
            "display.max_column_width",
            "display.default_background",
        ];

        for field_path in option_fields {
            if seen_fields.contains(field_path) || !comments.contains_key(field_path) {
                continue;
            }
            let Some((section, field_name)) = field_path.split_once('.') else {
                continue;
            };
            let section_header = format!("[{}]", section);
            let Some(section_pos) = result.find(&section_header) else {
                continue;
            };
            let after_header_start = section_pos + section_header.len();
            let newline_pos = result[after_header_start..].find('\n').unwrap_or(0);
            let insert_pos = after_header_start + newline_pos + 1;

            let mut new_content = String::new();
            if let Some(comment) = comments.get(field_path) {
                for comment_line in comment.lines() {
                    new_content.push_str("# ");
                    new_content.push_str(comment_line);
                    new_content.push('\n');
                }
            }
            new_content.push_str(&format!("# {} = null\n\n", field_name));
            result.insert_str(insert_pos, &new_content);
        }

        result
    }

    /// Extract section name from TOML line like "[performance]" or "[theme.colors]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    fn extract_field_path(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }
        let (field_name, _) = trimmed.split_once('=')?;
        let field_name = field_name.trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        let template = self.generate_default_config()?;
        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub server: ServerConfig,
    pub display: DisplayConfig,
    pub performance: PerformanceConfig,
    pub highlight: RangeRules,
    pub theme: ThemeConfig,
    pub debug: DebugConfig,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "server",
        "# ============================================================================\n# D-Tale Server\n# ============================================================================",
    ),
    (
        "display",
        "# ============================================================================\n# Display Settings\n# ============================================================================",
    ),
    (
        "performance",
        "# ============================================================================\n# Performance Settings\n# ============================================================================",
    ),
    (
        "highlight",
        "# ============================================================================\n# Range Highlighting (background mode \"range\")\n# ============================================================================\n# Rules are checked in order: equals, greater_than, less_than. Example:\n#   equals = { value = 0.0, color = \"#cccccc\" }\n#   greater_than = { value = 100.0, color = \"#ffb2b2\" }",
    ),
    (
        "theme",
        "# ============================================================================\n# Color Theme\n# ============================================================================",
    ),
    (
        "theme.colors",
        "# Color definitions\n# Supported formats:\n#   - Named colors: \"red\", \"blue\", \"bright_red\", \"dark_gray\", etc. (case-insensitive)\n#   - Hex colors: \"#ff0000\" or \"#FF0000\" (case-insensitive)\n#   - Indexed colors: \"indexed(0-255)\" for specific xterm 256-color palette entries\n# Colors automatically adapt to your terminal's capabilities",
    ),
    (
        "debug",
        "# ============================================================================\n# Debug Settings\n# ============================================================================",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub data_id: String,
    pub timeout_secs: u64,
}

const SERVER_COMMENTS: &[(&str, &str)] = &[
    ("url", "Base URL of the D-Tale server"),
    ("data_id", "Dataset identifier to open"),
    ("timeout_secs", "HTTP request timeout in seconds"),
];

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:40000".to_string(),
            data_id: "1".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ServerConfig::default();
        if other.url != default.url {
            self.url = other.url;
        }
        if other.data_id != default.data_id {
            self.data_id = other.data_id;
        }
        if other.timeout_secs != default.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Rows requested per fetch.
    pub page_size: usize,
    /// Auto-size cap in characters (None = no cap).
    pub max_column_width: Option<u16>,
    pub min_column_width: u16,
    pub table_cell_padding: u16,
    pub float_precision: usize,
    /// Max rows kept in memory (0 = no limit).
    pub max_cached_rows: usize,
    pub default_background: Option<BackgroundMode>,
}

const DISPLAY_COMMENTS: &[(&str, &str)] = &[
    (
        "page_size",
        "Number of rows requested from the server per fetch",
    ),
    (
        "max_column_width",
        "Maximum auto-sized column width in characters\nWider values are truncated; unset for no limit",
    ),
    ("min_column_width", "Minimum column width in characters"),
    (
        "table_cell_padding",
        "Number of spaces between columns in the grid (>= 0)",
    ),
    (
        "float_precision",
        "Decimal places shown for floating point values",
    ),
    (
        "max_cached_rows",
        "Maximum rows kept in memory (0 = no limit)\nRows farthest from the view are dropped first",
    ),
    (
        "default_background",
        "Background mode at startup: heatmap-col, heatmap-all, dtypes, missing,\noutliers, lowVariance or range",
    ),
];

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_size: 56,
            max_column_width: Some(40),
            min_column_width: 3,
            table_cell_padding: 1,
            float_precision: 2,
            max_cached_rows: 0,
            default_background: None,
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.page_size != default.page_size {
            self.page_size = other.page_size;
        }
        if other.max_column_width != default.max_column_width {
            self.max_column_width = other.max_column_width;
        }
        if other.min_column_width != default.min_column_width {
            self.min_column_width = other.min_column_width;
        }
        if other.table_cell_padding != default.table_cell_padding {
            self.table_cell_padding = other.table_cell_padding;
        }
        if other.float_precision != default.float_precision {
            self.float_precision = other.float_precision;
        }
        if other.max_cached_rows != default.max_cached_rows {
            self.max_cached_rows = other.max_cached_rows;
        }
        if other.default_background.is_some() {
            self.default_background = other.default_background;
        }
    }

    /// Grid options for these display settings.
    pub fn grid_options(&self) -> GridOptions {
        GridOptions {
            page_size: self.page_size,
            sizing: SizingOptions {
                min_width: self.min_column_width,
                max_width: self.max_column_width,
            },
            cell_padding: self.table_cell_padding,
            float_precision: self.float_precision,
            max_cached_rows: self.max_cached_rows,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub event_poll_interval_ms: u64,
}

const PERFORMANCE_COMMENTS: &[(&str, &str)] = &[(
    "event_poll_interval_ms",
    "Event polling interval in milliseconds\nLower values = more responsive but higher CPU usage",
)];

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            event_poll_interval_ms: 25,
        }
    }
}

impl PerformanceConfig {
    pub fn merge(&mut self, other: Self) {
        let default = PerformanceConfig::default();
        if other.event_poll_interval_ms != default.event_poll_interval_ms {
            self.event_poll_interval_ms = other.event_poll_interval_ms;
        }
    }
}

const HIGHLIGHT_COMMENTS: &[(&str, &str)] = &[(
    "columns",
    "Columns the rules apply to; empty means every numeric column",
)];

impl RangeRules {
    pub fn merge(&mut self, other: Self) {
        if !other.columns.is_empty() {
            self.columns = other.columns;
        }
        if other.equals.is_some() {
            self.equals = other.equals;
        }
        if other.greater_than.is_some() {
            self.greater_than = other.greater_than;
        }
        if other.less_than.is_some() {
            self.less_than = other.less_than;
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, rule) in [
            ("equals", &self.equals),
            ("greater_than", &self.greater_than),
            ("less_than", &self.less_than),
        ] {
            if let Some(rule) = rule {
                if Rgb::from_hex(&rule.color).is_none() {
                    return Err(eyre!(
                        "highlight.{}.color: '{}' is not a hex color (#rrggbb)",
                        name,
                        rule.color
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

impl ThemeConfig {
    pub fn merge(&mut self, other: Self) {
        self.colors.merge(other.colors);
    }
}

/// Colors used by the UI. Each value is a named color, `#rrggbb`, or
/// `indexed(n)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub keybind_hints: String,
    pub keybind_labels: String,
    pub throbber: String,
    pub error: String,
    pub dimmed: String,
    pub background: String,
    pub surface: String,
    pub controls_bg: String,
    pub text_primary: String,
    pub text_secondary: String,
    pub table_header: String,
    pub table_header_bg: String,
    pub row_numbers: String,
    pub column_separator: String,
    pub cursor: String,
    pub selection: String,
    pub modal_border_active: String,
    pub modal_border_error: String,
    /// "default" = no alternate row color
    pub alternate_row_color: String,
}

const COLOR_COMMENTS: &[(&str, &str)] = &[
    ("keybind_hints", "Keybind hints (modals, menus)"),
    ("keybind_labels", "Action labels in controls bar"),
    ("throbber", "Busy indicator (spinner) in control bar"),
    ("error", "Error messages"),
    ("dimmed", "Dimmed elements"),
    ("background", "Main background"),
    ("surface", "Modal/surface backgrounds"),
    ("controls_bg", "Controls bar background"),
    ("text_primary", "Primary text"),
    ("text_secondary", "Secondary text"),
    ("table_header", "Grid column header text"),
    ("table_header_bg", "Grid column header background"),
    ("row_numbers", "Index column text"),
    ("column_separator", "Line between locked and scrolling columns"),
    ("cursor", "Background of the cell under the cursor"),
    ("selection", "Background of selected cells"),
    ("modal_border_active", "Active modal elements"),
    ("modal_border_error", "Error modal borders"),
    (
        "alternate_row_color",
        "Background color for every other row\nSet to \"default\" to disable alternate row coloring",
    ),
];

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            keybind_hints: "cyan".to_string(),
            keybind_labels: "indexed(252)".to_string(),
            throbber: "cyan".to_string(),
            error: "red".to_string(),
            dimmed: "dark_gray".to_string(),
            background: "default".to_string(),
            surface: "default".to_string(),
            controls_bg: "indexed(235)".to_string(),
            text_primary: "default".to_string(),
            text_secondary: "indexed(240)".to_string(),
            table_header: "white".to_string(),
            table_header_bg: "indexed(235)".to_string(),
            row_numbers: "dark_gray".to_string(),
            column_separator: "cyan".to_string(),
            cursor: "indexed(238)".to_string(),
            selection: "indexed(24)".to_string(),
            modal_border_active: "yellow".to_string(),
            modal_border_error: "red".to_string(),
            alternate_row_color: "default".to_string(),
        }
    }
}

impl ColorConfig {
    /// (name, value) for every color, in declaration order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("keybind_hints", &self.keybind_hints),
            ("keybind_labels", &self.keybind_labels),
            ("throbber", &self.throbber),
            ("error", &self.error),
            ("dimmed", &self.dimmed),
            ("background", &self.background),
            ("surface", &self.surface),
            ("controls_bg", &self.controls_bg),
            ("text_primary", &self.text_primary),
            ("text_secondary", &self.text_secondary),
            ("table_header", &self.table_header),
            ("table_header_bg", &self.table_header_bg),
            ("row_numbers", &self.row_numbers),
            ("column_separator", &self.column_separator),
            ("cursor", &self.cursor),
            ("selection", &self.selection),
            ("modal_border_active", &self.modal_border_active),
            ("modal_border_error", &self.modal_border_error),
            ("alternate_row_color", &self.alternate_row_color),
        ]
    }

    fn validate(&self, parser: &ColorParser) -> Result<()> {
        for (name, value) in self.entries() {
            if name == "alternate_row_color" && value == "default" {
                continue;
            }
            parser.parse(value).map_err(|e| {
                eyre!(
                    "theme.colors.{}: {}. Use a valid color name (e.g. red, cyan, bright_red), \
                     hex (#rrggbb), or indexed(0-255)",
                    name,
                    e
                )
            })?;
        }
        Ok(())
    }

    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(
                    if other.$field != default.$field {
                        self.$field = other.$field;
                    }
                )*
            };
        }
        take!(
            keybind_hints,
            keybind_labels,
            throbber,
            error,
            dimmed,
            background,
            surface,
            controls_bg,
            text_primary,
            text_secondary,
            table_header,
            table_header_bg,
            row_numbers,
            column_separator,
            cursor,
            selection,
            modal_border_active,
            modal_border_error,
            alternate_row_color,
        );
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

const DEBUG_COMMENTS: &[(&str, &str)] = &[("enabled", "Enable debug overlay by default")];

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled {
            self.enabled = true;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            server: ServerConfig::default(),
            display: DisplayConfig::default(),
            performance: PerformanceConfig::default(),
            highlight: RangeRules::default(),
            theme: ThemeConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Load using an explicit config directory.
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let config_path = manager.config_path("config.toml");
        let mut config = AppConfig::default();
        config.merge(Self::load_user_config(&config_path)?);

        config.validate().map_err(|e| {
            eyre!(
                "Invalid configuration in {}: {}",
                config_path.display(),
                e
            )
        })?;

        Ok(config)
    }

    fn load_user_config(config_path: &Path) -> Result<AppConfig> {
        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }
        self.server.merge(other.server);
        self.display.merge(other.display);
        self.performance.merge(other.performance);
        self.highlight.merge(other.highlight);
        self.theme.merge(other.theme);
        self.debug.merge(other.debug);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }
        if self.server.url.trim().is_empty() {
            return Err(eyre!("server.url must not be empty"));
        }
        if self.server.timeout_secs == 0 {
            return Err(eyre!("server.timeout_secs must be greater than 0"));
        }
        if self.display.page_size == 0 {
            return Err(eyre!("display.page_size must be greater than 0"));
        }
        if let Some(max) = self.display.max_column_width {
            if max < self.display.min_column_width {
                return Err(eyre!(
                    "display.max_column_width ({}) must be at least min_column_width ({})",
                    max,
                    self.display.min_column_width
                ));
            }
        }
        if self.performance.event_poll_interval_ms == 0 {
            return Err(eyre!("event_poll_interval_ms must be greater than 0"));
        }
        self.highlight.validate()?;

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }
}

/// Color parser with terminal capability detection
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    /// Create a new ColorParser with automatic terminal capability detection
    pub fn new() -> Self {
        let no_color = std::env::var("NO_COLOR").is_ok();
        let support = supports_color::on(Stream::Stdout);

        Self {
            supports_true_color: support.as_ref().map(|s| s.has_16m).unwrap_or(false),
            supports_256: support.as_ref().map(|s| s.has_256).unwrap_or(false),
            no_color,
        }
    }

    /// Parser with fixed capabilities, independent of the environment.
    pub fn with_capabilities(true_color: bool, colors_256: bool) -> Self {
        Self {
            supports_true_color: true_color,
            supports_256: colors_256,
            no_color: false,
        }
    }

    /// Parse a color string (hex or named) and convert to appropriate terminal color
    pub fn parse(&self, s: &str) -> Result<Color> {
        if self.no_color {
            return Ok(Color::Reset);
        }

        let trimmed = s.trim();

        if trimmed.starts_with('#') && trimmed.len() == 7 {
            let rgb = Rgb::from_hex(trimmed).ok_or_else(|| {
                eyre!(
                    "Invalid hex color format: '{}'. Expected format: #rrggbb",
                    trimmed
                )
            })?;
            return Ok(self.rgb(rgb));
        }

        if trimmed.to_lowercase().starts_with("indexed(") && trimmed.ends_with(')') {
            let num_str = &trimmed[8..trimmed.len() - 1];
            let num = num_str.parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            return Ok(Color::Indexed(num));
        }

        let lower = trimmed.to_lowercase();
        match lower.as_str() {
            "black" => Ok(Color::Black),
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "cyan" => Ok(Color::Cyan),
            "white" => Ok(Color::White),

            "bright_black" | "bright black" => Ok(Color::Indexed(8)),
            "bright_red" | "bright red" => Ok(Color::Indexed(9)),
            "bright_green" | "bright green" => Ok(Color::Indexed(10)),
            "bright_yellow" | "bright yellow" => Ok(Color::Indexed(11)),
            "bright_blue" | "bright blue" => Ok(Color::Indexed(12)),
            "bright_magenta" | "bright magenta" => Ok(Color::Indexed(13)),
            "bright_cyan" | "bright cyan" => Ok(Color::Indexed(14)),
            "bright_white" | "bright white" => Ok(Color::Indexed(15)),

            "gray" | "grey" => Ok(Color::Indexed(8)),
            "dark_gray" | "dark gray" | "dark_grey" | "dark grey" => Ok(Color::Indexed(8)),
            "light_gray" | "light gray" | "light_grey" | "light grey" => Ok(Color::Indexed(7)),

            "reset" | "default" | "none" => Ok(Color::Reset),

            _ => Err(eyre!(
                "Unknown color name: '{}'. Supported: basic ANSI colors (red, blue, etc.), \
                 bright variants (bright_red, etc.), or hex colors (#ff0000)",
                trimmed
            )),
        }
    }

    /// Terminal color for an RGB value, reduced to what the terminal supports.
    pub fn rgb(&self, rgb: Rgb) -> Color {
        let Rgb(r, g, b) = rgb;
        if self.no_color {
            Color::Reset
        } else if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            rgb_to_basic_ansi(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert RGB to nearest 256-color palette index
/// Uses standard xterm 256-color palette
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 10 {
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        if gray < 8 {
            return 16;
        } else if gray > 247 {
            return 231;
        } else {
            return 232 + ((gray - 8) * 24 / 240) as u8;
        }
    }

    let r_idx = (r as u16 * 5 / 255) as u8;
    let g_idx = (g as u16 * 5 / 255) as u8;
    let b_idx = (b as u16 * 5 / 255) as u8;

    16 + 36 * r_idx + 6 * g_idx + b_idx
}

/// Convert RGB to nearest basic ANSI color (8 colors)
pub fn rgb_to_basic_ansi(r: u8, g: u8, b: u8) -> Color {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 30 {
        let avg = (r as u16 + g as u16 + b as u16) / 3;
        return if avg < 64 { Color::Black } else { Color::White };
    }

    match (r > 128, g > 128, b > 128) {
        (false, false, false) => Color::Black,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (true, true, false) => Color::Yellow,
        (false, false, true) => Color::Blue,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => Color::White,
    }
}

/// Theme containing parsed colors ready for use
#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
}

impl Theme {
    /// Create a Theme from a ThemeConfig by parsing all color strings
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        Self::from_config_with(config, &ColorParser::new())
    }

    pub fn from_config_with(config: &ThemeConfig, parser: &ColorParser) -> Result<Self> {
        let mut colors = HashMap::new();
        for (name, value) in config.colors.entries() {
            if name == "alternate_row_color" && value == "default" {
                continue;
            }
            colors.insert(name.to_string(), parser.parse(value)?);
        }
        Ok(Self { colors })
    }

    /// Get a color by name, returns Reset if not found
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }

    pub fn get_optional(&self, name: &str) -> Option<Color> {
        self.colors.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colors() {
        let parser = ColorParser::with_capabilities(true, true);
        assert_eq!(parser.parse("#ff8000").unwrap(), Color::Rgb(255, 128, 0));
        assert_eq!(parser.parse("indexed(236)").unwrap(), Color::Indexed(236));
        assert_eq!(parser.parse("Bright_Red").unwrap(), Color::Indexed(9));
        assert!(parser.parse("indexed(300)").is_err());
        assert!(parser.parse("chartreuse-ish").is_err());
    }

    #[test]
    fn test_rgb_reduced_to_terminal_capability() {
        let rgb = Rgb(255, 0, 0);
        assert_eq!(
            ColorParser::with_capabilities(true, true).rgb(rgb),
            Color::Rgb(255, 0, 0)
        );
        assert_eq!(
            ColorParser::with_capabilities(false, true).rgb(rgb),
            Color::Indexed(196)
        );
        assert_eq!(ColorParser::with_capabilities(false, false).rgb(rgb), Color::Red);
    }

    #[test]
    fn test_display_merge_keeps_unset_values() {
        let mut display = DisplayConfig::default();
        let other = DisplayConfig {
            page_size: 100,
            ..DisplayConfig::default()
        };
        display.merge(other);
        assert_eq!(display.page_size, 100);
        assert_eq!(display.max_column_width, Some(40));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.display.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.highlight.equals = Some(crate::background::RangeRule {
            value: 1.0,
            color: "red".to_string(),
        });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("highlight.equals.color"), "got: {}", err);
    }

    #[test]
    fn test_theme_skips_default_alternate_row() {
        let theme = Theme::from_config_with(
            &ThemeConfig::default(),
            &ColorParser::with_capabilities(true, true),
        )
        .unwrap();
        assert!(theme.get_optional("alternate_row_color").is_none());
        assert_eq!(theme.get("row_numbers"), Color::Indexed(8));
        assert_eq!(theme.get("nonexistent"), Color::Reset);
    }
}

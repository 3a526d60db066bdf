//! Shared CLI definitions for dtgrid.
//!
//! Used by the main application and by the build script (manpage).

use clap::{Parser, ValueEnum};

/// Background overlay to enable at startup.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BackgroundModeArg {
    /// Red-yellow-green scale per column
    HeatmapCol,
    /// Red-yellow-green scale across every numeric column
    HeatmapAll,
    /// Fixed color per column type
    Dtypes,
    /// Highlight blank values in columns that have missing data
    Missing,
    /// Highlight values outside each column's outlier range
    Outliers,
    /// Highlight columns flagged as low variance
    LowVariance,
    /// Highlight values matching the configured range rules
    Range,
}

impl BackgroundModeArg {
    /// The mode's name as used by the backend and the config file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeatmapCol => "heatmap-col",
            Self::HeatmapAll => "heatmap-all",
            Self::Dtypes => "dtypes",
            Self::Missing => "missing",
            Self::Outliers => "outliers",
            Self::LowVariance => "lowVariance",
            Self::Range => "range",
        }
    }
}

/// Command-line arguments for dtgrid
#[derive(Clone, Parser, Debug)]
#[command(
    name = "dtgrid",
    version,
    about = "Browse a D-Tale session from the terminal",
    long_about = "Browse a D-Tale session from the terminal.\n\n\
                  dtgrid connects to a running D-Tale server, pages rows in as you scroll, \
                  and supports range selection, clipboard copy, column locking and \
                  background highlighting (heatmaps, dtypes, missing values, outliers)."
)]
pub struct Args {
    /// Base URL of the D-Tale server (overrides config). Example: http://localhost:40000
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Identifier of the D-Tale dataset to open (overrides config)
    #[arg(long = "data-id", value_name = "ID")]
    pub data_id: Option<String>,

    /// Number of rows fetched per page
    #[arg(long = "page-size", value_name = "N")]
    pub page_size: Option<usize>,

    /// Maximum auto-sized column width in characters; wider content is truncated
    #[arg(long = "max-column-width", value_name = "N")]
    pub max_column_width: Option<usize>,

    /// HTTP timeout in seconds for requests to the server
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Background overlay to enable at startup
    #[arg(long = "background", value_enum)]
    pub background: Option<BackgroundModeArg>,

    /// Initial cursor cell as COLUMN|ROW (1-based data coordinates, 0 is the index/header)
    #[arg(long = "cell", value_name = "COL|ROW")]
    pub cell: Option<String>,

    /// Enable debug mode to show operational information
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Write the log to this file instead of the cache directory
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<std::path::PathBuf>,

    /// Clear all cache data and exit
    #[arg(long = "clear-cache", action)]
    pub clear_cache: bool,

    /// Generate default configuration file at default location
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

//! Command-line arguments and how they override the loaded config.

use color_eyre::Result;

use crate::background::BackgroundMode;
use crate::config::AppConfig;
use crate::coord::CellCoord;

pub use dtgrid_cli::{Args, BackgroundModeArg};

impl From<BackgroundModeArg> for BackgroundMode {
    fn from(arg: BackgroundModeArg) -> Self {
        match arg {
            BackgroundModeArg::HeatmapCol => Self::HeatmapCol,
            BackgroundModeArg::HeatmapAll => Self::HeatmapAll,
            BackgroundModeArg::Dtypes => Self::Dtypes,
            BackgroundModeArg::Missing => Self::Missing,
            BackgroundModeArg::Outliers => Self::Outliers,
            BackgroundModeArg::LowVariance => Self::LowVariance,
            BackgroundModeArg::Range => Self::Range,
        }
    }
}

/// Apply CLI overrides on top of `config` and re-validate.
pub fn apply_args(config: &mut AppConfig, args: &Args) -> Result<()> {
    if let Some(url) = &args.url {
        config.server.url = url.clone();
    }
    if let Some(data_id) = &args.data_id {
        config.server.data_id = data_id.clone();
    }
    if let Some(timeout) = args.timeout_secs {
        config.server.timeout_secs = timeout;
    }
    if let Some(page_size) = args.page_size {
        config.display.page_size = page_size;
    }
    if let Some(width) = args.max_column_width {
        config.display.max_column_width = Some(width.min(u16::MAX as usize) as u16);
    }
    if let Some(background) = args.background {
        config.display.default_background = Some(background.into());
    }
    if args.debug {
        config.debug.enabled = true;
    }
    config.validate()
}

/// Initial cursor from `--cell`.
pub fn initial_cell(args: &Args) -> Result<Option<CellCoord>> {
    args.cell.as_deref().map(str::parse).transpose()
}

//! Per-cell background overlays.
//!
//! [`BackgroundResolver::resolve`] maps (mode, column metadata, cell) to a
//! [`CellStyle`]. The only state it keeps is the outlier scales, built the
//! first time a column needs them and keyed by column name.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use color_eyre::eyre::{eyre, Report};
use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnType};
use crate::page::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const RED: Rgb = Rgb(255, 0, 0);
pub const YELLOW: Rgb = Rgb(255, 255, 0);
pub const GREEN: Rgb = Rgb(0, 128, 0);
pub const DODGER_BLUE: Rgb = Rgb(30, 144, 255);
pub const WHITE: Rgb = Rgb(255, 255, 255);

pub const MISSING_COLOR: Rgb = Rgb(255, 178, 178);
pub const LOW_VARIANCE_COLOR: Rgb = Rgb(255, 214, 153);

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self(r, g, b))
    }

    /// Linear interpolation in RGB space, `t` clamped to [0, 1].
    pub fn mix(a: Rgb, b: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let channel = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
        Rgb(channel(a.0, b.0), channel(a.1, b.1), channel(a.2, b.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellStyle {
    pub background: Option<Rgb>,
}

impl CellStyle {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn background(color: Rgb) -> Self {
        Self {
            background: Some(color),
        }
    }
}

/// Piecewise-linear color scale over evenly spaced stops in `[lo, hi]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    colors: Vec<Rgb>,
    lo: f64,
    hi: f64,
}

impl ColorScale {
    pub fn new(colors: Vec<Rgb>, lo: f64, hi: f64) -> Self {
        Self { colors, lo, hi }
    }

    /// Color at `value`, clamped to the domain. A zero-width domain yields the
    /// first color at or below `lo` and the last color above it.
    pub fn at(&self, value: f64) -> Rgb {
        let (Some(first), Some(last)) = (self.colors.first(), self.colors.last()) else {
            return WHITE;
        };
        if self.hi <= self.lo {
            return if value <= self.lo { *first } else { *last };
        }
        let t = ((value - self.lo) / (self.hi - self.lo)).clamp(0.0, 1.0);
        let segments = self.colors.len() - 1;
        if segments == 0 {
            return *first;
        }
        let scaled = t * segments as f64;
        let i = (scaled.floor() as usize).min(segments - 1);
        Rgb::mix(self.colors[i], self.colors[i + 1], scaled - i as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackgroundMode {
    #[serde(rename = "heatmap-col")]
    HeatmapCol,
    #[serde(rename = "heatmap-all")]
    HeatmapAll,
    #[serde(rename = "dtypes")]
    Dtypes,
    #[serde(rename = "missing")]
    Missing,
    #[serde(rename = "outliers")]
    Outliers,
    #[serde(rename = "lowVariance")]
    LowVariance,
    #[serde(rename = "range")]
    Range,
}

impl BackgroundMode {
    pub const ALL: [BackgroundMode; 7] = [
        Self::HeatmapCol,
        Self::HeatmapAll,
        Self::Dtypes,
        Self::Missing,
        Self::Outliers,
        Self::LowVariance,
        Self::Range,
    ];

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

    pub fn label(&self) -> &'static str {
        match self {
            Self::HeatmapCol => "Heat Map (column)",
            Self::HeatmapAll => "Heat Map (all)",
            Self::Dtypes => "Data Types",
            Self::Missing => "Missing",
            Self::Outliers => "Outliers",
            Self::LowVariance => "Low Variance",
            Self::Range => "Range",
        }
    }

    /// Next mode in the `b` key cycle; the last mode cycles back to none.
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::ALL[0]),
            Some(mode) => {
                let pos = Self::ALL.iter().position(|m| *m == mode).unwrap_or(0);
                Self::ALL.get(pos + 1).copied()
            }
        }
    }
}

impl FromStr for BackgroundMode {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                eyre!(
                    "Unknown background mode '{}'. Expected one of: {}",
                    s,
                    names.join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    pub value: f64,
    pub color: String,
}

/// Thresholds for the `range` mode, evaluated as equals, greater-than,
/// less-than; the first match colors the cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeRules {
    /// Restrict to these columns. Empty means every numeric column.
    pub columns: Vec<String>,
    pub equals: Option<RangeRule>,
    pub greater_than: Option<RangeRule>,
    pub less_than: Option<RangeRule>,
}

impl RangeRules {
    pub fn is_empty(&self) -> bool {
        self.equals.is_none() && self.greater_than.is_none() && self.less_than.is_none()
    }

    fn applies_to(&self, column: &Column) -> bool {
        self.columns.is_empty() || self.columns.iter().any(|c| *c == column.name)
    }

    pub fn color_for(&self, value: f64) -> Option<Rgb> {
        let rule = [
            self.equals.as_ref().filter(|r| value == r.value),
            self.greater_than.as_ref().filter(|r| value > r.value),
            self.less_than.as_ref().filter(|r| value < r.value),
        ]
        .into_iter()
        .flatten()
        .next()?;
        Rgb::from_hex(&rule.color)
    }
}

pub fn dtype_color(column_type: ColumnType) -> Option<Rgb> {
    match column_type {
        ColumnType::Category => Some(Rgb(0xe1, 0xd5, 0xe7)),
        ColumnType::Timedelta => Some(Rgb(0xff, 0xe6, 0xcc)),
        ColumnType::Float => Some(Rgb(0xb2, 0xdf, 0xdb)),
        ColumnType::Int => Some(Rgb(0xbb, 0xde, 0xfb)),
        ColumnType::Date => Some(Rgb(0xff, 0xf5, 0x9d)),
        ColumnType::Bool => Some(Rgb(0xc8, 0xe6, 0xc9)),
        ColumnType::String | ColumnType::Unknown => None,
    }
}

/// Red-yellow-green color for `raw` within `[min, max]`. A degenerate range
/// maps everything to the midpoint.
pub fn heat_map_color(raw: f64, min: f64, max: f64) -> Rgb {
    let scale = ColorScale::new(vec![RED, YELLOW, GREEN], 0.0, 1.0);
    if max <= min {
        return scale.at(0.5);
    }
    scale.at((raw - min) / (max - min))
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlierScales {
    pub lower: f64,
    pub upper: f64,
    low: ColorScale,
    high: ColorScale,
}

impl OutlierScales {
    pub fn color_for(&self, value: f64) -> Option<Rgb> {
        if value < self.lower {
            Some(self.low.at(value))
        } else if value > self.upper {
            Some(self.high.at(value))
        } else {
            None
        }
    }
}

/// Blue scale from the column minimum up to `lower`, red scale from `upper`
/// up to the column maximum. None when the column has no outlier range.
pub fn build_outlier_scales(column: &Column) -> Option<OutlierScales> {
    let range = column.outlier_range?;
    let min = column.min.unwrap_or(range.lower).min(range.lower);
    let max = column.max.unwrap_or(range.upper).max(range.upper);
    Some(OutlierScales {
        lower: range.lower,
        upper: range.upper,
        low: ColorScale::new(vec![DODGER_BLUE, WHITE], min, range.lower),
        high: ColorScale::new(vec![WHITE, RED], range.upper, max),
    })
}

fn is_blank(view: &str) -> bool {
    view.trim().is_empty()
}

pub struct BackgroundResolver<'a> {
    mode: Option<BackgroundMode>,
    range_rules: &'a RangeRules,
    grid_bounds: Option<(f64, f64)>,
    outlier_scales: HashMap<String, Option<OutlierScales>>,
}

impl<'a> BackgroundResolver<'a> {
    pub fn new(
        mode: Option<BackgroundMode>,
        columns: &[Column],
        range_rules: &'a RangeRules,
    ) -> Self {
        let grid_bounds = match mode {
            Some(BackgroundMode::HeatmapAll) => grid_bounds(columns),
            _ => None,
        };
        Self {
            mode,
            range_rules,
            grid_bounds,
            outlier_scales: HashMap::new(),
        }
    }

    pub fn mode(&self) -> Option<BackgroundMode> {
        self.mode
    }

    pub fn resolve(&mut self, column: &Column, cell: &CellValue) -> CellStyle {
        let Some(mode) = self.mode else {
            return CellStyle::none();
        };
        if column.is_index() {
            return CellStyle::none();
        }
        let numeric = || {
            if column.column_type().is_numeric() && !is_blank(&cell.view) {
                cell.raw.as_f64()
            } else {
                None
            }
        };
        let color = match mode {
            BackgroundMode::HeatmapCol => match (numeric(), column.min, column.max) {
                (Some(raw), Some(min), Some(max)) => Some(heat_map_color(raw, min, max)),
                _ => None,
            },
            BackgroundMode::HeatmapAll => match (numeric(), self.grid_bounds) {
                (Some(raw), Some((min, max))) => Some(heat_map_color(raw, min, max)),
                _ => None,
            },
            BackgroundMode::Dtypes => dtype_color(column.column_type()),
            BackgroundMode::Missing => {
                if column.has_missing && is_blank(&cell.view) {
                    Some(MISSING_COLOR)
                } else {
                    None
                }
            }
            BackgroundMode::Outliers => {
                if column.has_outliers {
                    match numeric() {
                        Some(raw) => self
                            .outlier_scales
                            .entry(column.name.clone())
                            .or_insert_with(|| build_outlier_scales(column))
                            .as_ref()
                            .and_then(|scales| scales.color_for(raw)),
                        None => None,
                    }
                } else {
                    None
                }
            }
            BackgroundMode::LowVariance => {
                if column.low_variance {
                    Some(LOW_VARIANCE_COLOR)
                } else {
                    None
                }
            }
            BackgroundMode::Range => {
                if self.range_rules.applies_to(column) {
                    numeric().and_then(|raw| self.range_rules.color_for(raw))
                } else {
                    None
                }
            }
        };
        CellStyle { background: color }
    }

    #[cfg(test)]
    fn cached_scales(&self) -> usize {
        self.outlier_scales.len()
    }
}

/// Minimum and maximum across every numeric, non-index column.
fn grid_bounds(columns: &[Column]) -> Option<(f64, f64)> {
    columns
        .iter()
        .filter(|c| !c.is_index() && c.column_type().is_numeric())
        .filter_map(|c| Some((c.min?, c.max?)))
        .reduce(|(lo, hi), (min, max)| (lo.min(min), hi.max(max)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::INDEX_COLUMN;
    use serde_json::json;

    fn cell(raw: serde_json::Value, view: &str) -> CellValue {
        CellValue::plain(raw, view.to_string())
    }

    #[test]
    fn test_heat_map_midpoint_example() {
        assert_eq!(heat_map_color(7.0, 5.0, 10.0).hex(), "#ffcc00");
        assert_eq!(heat_map_color(5.0, 5.0, 10.0), RED);
        assert_eq!(heat_map_color(10.0, 5.0, 10.0), GREEN);
        assert_eq!(heat_map_color(3.0, 3.0, 3.0), YELLOW);
    }

    #[test]
    fn test_heatmap_col_resolves_and_skips_blank() {
        let rules = RangeRules::default();
        let col = Column::new("x", "float64", 1).with_range(5.0, 10.0);
        let columns = vec![col.clone()];
        let mut resolver =
            BackgroundResolver::new(Some(BackgroundMode::HeatmapCol), &columns, &rules);
        let style = resolver.resolve(&col, &cell(json!(7.0), "7.00"));
        assert_eq!(style.background.map(|c| c.hex()), Some("#ffcc00".to_string()));
        assert_eq!(resolver.resolve(&col, &cell(json!(null), "")), CellStyle::none());
    }

    #[test]
    fn test_heatmap_all_uses_grid_bounds() {
        let rules = RangeRules::default();
        let a = Column::new("a", "int64", 1).with_range(0.0, 4.0);
        let b = Column::new("b", "int64", 2).with_range(2.0, 10.0);
        let columns = vec![a.clone(), b];
        let mut resolver =
            BackgroundResolver::new(Some(BackgroundMode::HeatmapAll), &columns, &rules);
        assert_eq!(resolver.resolve(&a, &cell(json!(10), "10")).background, Some(GREEN));
        assert_eq!(resolver.resolve(&a, &cell(json!(0), "0")).background, Some(RED));
    }

    #[test]
    fn test_dtypes_excludes_index_and_strings() {
        let rules = RangeRules::default();
        let index = Column::new(INDEX_COLUMN, "int64", 0);
        let text = Column::new("s", "object", 1);
        let num = Column::new("n", "int64", 2);
        let columns = vec![index.clone(), text.clone(), num.clone()];
        let mut resolver = BackgroundResolver::new(Some(BackgroundMode::Dtypes), &columns, &rules);
        assert_eq!(resolver.resolve(&index, &cell(json!(0), "0")), CellStyle::none());
        assert_eq!(resolver.resolve(&text, &cell(json!("a"), "a")), CellStyle::none());
        assert_eq!(
            resolver.resolve(&num, &cell(json!(1), "1")).background,
            dtype_color(ColumnType::Int)
        );
    }

    #[test]
    fn test_missing_requires_column_flag() {
        let rules = RangeRules::default();
        let flagged = Column::new("a", "object", 1).with_missing();
        let clean = Column::new("b", "object", 2);
        let columns = vec![flagged.clone(), clean.clone()];
        let mut resolver = BackgroundResolver::new(Some(BackgroundMode::Missing), &columns, &rules);
        assert_eq!(
            resolver.resolve(&flagged, &cell(json!(null), "  ")).background,
            Some(MISSING_COLOR)
        );
        assert_eq!(resolver.resolve(&flagged, &cell(json!("x"), "x")), CellStyle::none());
        assert_eq!(resolver.resolve(&clean, &cell(json!(null), "")), CellStyle::none());
    }

    #[test]
    fn test_outliers_blue_below_red_above_none_inside() {
        let rules = RangeRules::default();
        let col = Column::new("v", "float64", 1)
            .with_range(0.0, 100.0)
            .with_outliers(10.0, 90.0);
        let columns = vec![col.clone()];
        let mut resolver =
            BackgroundResolver::new(Some(BackgroundMode::Outliers), &columns, &rules);

        assert_eq!(resolver.resolve(&col, &cell(json!(0.0), "0.00")).background, Some(DODGER_BLUE));
        assert_eq!(resolver.resolve(&col, &cell(json!(100.0), "100.00")).background, Some(RED));
        assert_eq!(resolver.resolve(&col, &cell(json!(50.0), "50.00")), CellStyle::none());
        assert_eq!(resolver.resolve(&col, &cell(json!(10.0), "10.00")), CellStyle::none());

        let below = resolver.resolve(&col, &cell(json!(5.0), "5.00")).background.unwrap();
        assert!(below.2 == 255 && below.0 > DODGER_BLUE.0);
        assert_eq!(resolver.cached_scales(), 1);
    }

    #[test]
    fn test_low_variance_and_range_rules() {
        let rules = RangeRules {
            columns: vec![],
            equals: Some(RangeRule { value: 0.0, color: "#cccccc".into() }),
            greater_than: Some(RangeRule { value: 5.0, color: "#00ff00".into() }),
            less_than: Some(RangeRule { value: 1.0, color: "#ff0000".into() }),
        };
        let col = Column::new("n", "int64", 1);
        let columns = vec![col.clone()];
        let mut resolver = BackgroundResolver::new(Some(BackgroundMode::Range), &columns, &rules);
        assert_eq!(
            resolver.resolve(&col, &cell(json!(0), "0")).background,
            Some(Rgb(204, 204, 204))
        );
        assert_eq!(resolver.resolve(&col, &cell(json!(9), "9")).background, Some(Rgb(0, 255, 0)));
        assert_eq!(resolver.resolve(&col, &cell(json!(-2), "-2")).background, Some(RED));
        assert_eq!(resolver.resolve(&col, &cell(json!(3), "3")), CellStyle::none());

        let mut flagged = Column::new("lv", "int64", 2);
        flagged.low_variance = true;
        let columns = vec![flagged.clone()];
        let mut resolver =
            BackgroundResolver::new(Some(BackgroundMode::LowVariance), &columns, &rules);
        assert_eq!(
            resolver.resolve(&flagged, &cell(json!(1), "1")).background,
            Some(LOW_VARIANCE_COLOR)
        );
    }

    #[test]
    fn test_mode_cycle_and_parse() {
        assert_eq!(BackgroundMode::cycle(None), Some(BackgroundMode::HeatmapCol));
        assert_eq!(
            BackgroundMode::cycle(Some(BackgroundMode::HeatmapCol)),
            Some(BackgroundMode::HeatmapAll)
        );
        assert_eq!(BackgroundMode::cycle(Some(BackgroundMode::Range)), None);
        assert_eq!("lowvariance".parse::<BackgroundMode>().unwrap(), BackgroundMode::LowVariance);
        assert!("sparkle".parse::<BackgroundMode>().is_err());
    }

    #[test]
    fn test_rgb_hex() {
        assert_eq!(Rgb::from_hex("#1e90ff"), Some(DODGER_BLUE));
        assert_eq!(Rgb::from_hex("1E90FF"), Some(DODGER_BLUE));
        assert_eq!(Rgb::from_hex("#12"), None);
        assert_eq!(DODGER_BLUE.to_string(), "#1e90ff");
    }
}

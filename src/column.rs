//! Column metadata as reported by the backend, plus the view-side fields
//! (width, resized) the grid maintains.

use serde::{Deserialize, Deserializer, Serialize};

/// Name of the row-index column the backend prepends to every dataset.
pub const INDEX_COLUMN: &str = "dtale_index";

/// Bounds outside of which a value counts as an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierRange {
    pub lower: f64,
    pub upper: f64,
}

/// Coarse type category derived from the pandas dtype string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Date,
    Timedelta,
    Bool,
    Category,
    String,
    Unknown,
}

impl ColumnType {
    pub fn from_dtype(dtype: &str) -> Self {
        let dtype = dtype.trim().to_lowercase();
        if dtype.starts_with("int") || dtype.starts_with("uint") {
            Self::Int
        } else if dtype.starts_with("float") {
            Self::Float
        } else if dtype.starts_with("datetime") || dtype.starts_with("timestamp") {
            Self::Date
        } else if dtype.starts_with("timedelta") {
            Self::Timedelta
        } else if dtype.starts_with("bool") {
            Self::Bool
        } else if dtype.starts_with("category") {
            Self::Category
        } else if matches!(dtype.as_str(), "object" | "string" | "str" | "unicode") {
            Self::String
        } else {
            Self::Unknown
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

impl SortDirection {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }

    pub fn marker(&self) -> char {
        match self {
            Self::Ascending => '▲',
            Self::Descending => '▼',
        }
    }
}

/// Sort specification in the backend's `[["col", "ASC"], ...]` shape.
pub type SortInfo = Vec<(String, SortDirection)>;

pub fn sort_for<'a>(name: &str, sort_info: &'a SortInfo) -> Option<&'a SortDirection> {
    sort_info
        .iter()
        .find(|(col, _)| col == name)
        .map(|(_, dir)| dir)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub dtype: String,
    #[serde(default)]
    pub index: usize,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, deserialize_with = "number")]
    pub min: Option<f64>,
    #[serde(default, deserialize_with = "number")]
    pub max: Option<f64>,
    #[serde(default, deserialize_with = "flag")]
    pub has_missing: bool,
    #[serde(default, deserialize_with = "flag")]
    pub has_outliers: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub outlier_range: Option<OutlierRange>,
    #[serde(default, deserialize_with = "flag")]
    pub low_variance: bool,
    /// Rendered width in terminal cells. 0 until the first sizing pass.
    #[serde(skip)]
    pub width: u16,
    /// True when the natural width exceeded the configured maximum.
    #[serde(skip)]
    pub resized: bool,
    /// Natural width of the widest loaded value.
    #[serde(skip)]
    pub data_width: u16,
    /// Natural width of the header label.
    #[serde(skip)]
    pub header_width: u16,
    /// Set by a manual resize; auto-sizing leaves the column alone.
    #[serde(skip)]
    pub manual_width: bool,
}

fn default_visible() -> bool {
    true
}

/// The backend reports some flags as counts (e.g. number of missing values)
/// and others as booleans; anything non-zero is true.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        serde_json::Value::String(s) => !s.is_empty() && s != "0" && s != "false",
        serde_json::Value::Object(m) => !m.is_empty(),
        _ => false,
    })
}

/// min/max arrive as numbers for numeric columns and as strings otherwise.
fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Empty objects (`{}`) stand for "no outlier range".
fn lenient<'de, D>(deserializer: D) -> Result<Option<OutlierRange>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
            index,
            visible: true,
            locked: false,
            min: None,
            max: None,
            has_missing: false,
            has_outliers: false,
            outlier_range: None,
            low_variance: false,
            width: 0,
            resized: false,
            data_width: 0,
            header_width: 0,
            manual_width: false,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_outliers(mut self, lower: f64, upper: f64) -> Self {
        self.has_outliers = true;
        self.outlier_range = Some(OutlierRange { lower, upper });
        self
    }

    pub fn with_missing(mut self) -> Self {
        self.has_missing = true;
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn column_type(&self) -> ColumnType {
        ColumnType::from_dtype(&self.dtype)
    }

    pub fn is_index(&self) -> bool {
        self.name == INDEX_COLUMN
    }
}

/// Put the index column first and lock it, adding it when the backend left
/// it out (`/dtale/dtypes` never lists it).
pub fn ensure_index_column(columns: &mut Vec<Column>) {
    let mut index = match columns.iter().position(Column::is_index) {
        Some(pos) => columns.remove(pos),
        None => Column::new(INDEX_COLUMN, "int64", 0),
    };
    index.locked = true;
    index.visible = true;
    columns.insert(0, index);
}

/// Stable partition: locked columns first, each group keeping its relative order.
pub fn order_columns(columns: &mut Vec<Column>) {
    let (mut locked, unlocked): (Vec<Column>, Vec<Column>) =
        std::mem::take(columns).into_iter().partition(|c| c.locked);
    locked.extend(unlocked);
    *columns = locked;
}

/// Columns in render order: visible only, locked first. Grid column index `i`
/// refers to element `i` of this list, so the index column sits at 0.
pub fn active_columns(columns: &[Column]) -> Vec<&Column> {
    let locked = columns.iter().filter(|c| c.visible && c.locked);
    let rest = columns.iter().filter(|c| c.visible && !c.locked);
    locked.chain(rest).collect()
}

/// Number of leading locked columns in the render order.
pub fn locked_count(columns: &[Column]) -> usize {
    columns.iter().filter(|c| c.visible && c.locked).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_from_dtype() {
        assert_eq!(ColumnType::from_dtype("int64"), ColumnType::Int);
        assert_eq!(ColumnType::from_dtype("uint8"), ColumnType::Int);
        assert_eq!(ColumnType::from_dtype("float32"), ColumnType::Float);
        assert_eq!(ColumnType::from_dtype("datetime64[ns]"), ColumnType::Date);
        assert_eq!(ColumnType::from_dtype("timedelta64[ns]"), ColumnType::Timedelta);
        assert_eq!(ColumnType::from_dtype("bool"), ColumnType::Bool);
        assert_eq!(ColumnType::from_dtype("category"), ColumnType::Category);
        assert_eq!(ColumnType::from_dtype("object"), ColumnType::String);
        assert_eq!(ColumnType::from_dtype("complex128"), ColumnType::Unknown);
    }

    #[test]
    fn test_deserialize_backend_column() {
        let json = r#"{
            "name": "price", "dtype": "float64", "index": 2,
            "hasMissing": 3, "hasOutliers": 0,
            "outlierRange": {"lower": 1.5, "upper": 9.0},
            "min": 0.5, "max": 12.0, "lowVariance": false
        }"#;
        let col: Column = serde_json::from_str(json).unwrap();
        assert_eq!(col.name, "price");
        assert!(col.visible);
        assert!(!col.locked);
        assert!(col.has_missing);
        assert!(!col.has_outliers);
        assert_eq!(col.outlier_range, Some(OutlierRange { lower: 1.5, upper: 9.0 }));
        assert_eq!(col.max, Some(12.0));
        assert_eq!(col.width, 0);
    }

    #[test]
    fn test_deserialize_lenient_fields() {
        let json = r#"{
            "name": "when", "dtype": "datetime64[ns]",
            "min": "2020-01-01", "max": "3.5",
            "outlierRange": {}, "lowVariance": {"ratio": 0.01}
        }"#;
        let col: Column = serde_json::from_str(json).unwrap();
        assert_eq!(col.min, None);
        assert_eq!(col.max, Some(3.5));
        assert_eq!(col.outlier_range, None);
        assert!(col.low_variance);
    }

    #[test]
    fn test_order_columns_locked_first_stable() {
        let mut cols = vec![
            Column::new("a", "int64", 0),
            Column::new("b", "int64", 1).locked(),
            Column::new("c", "int64", 2),
            Column::new("d", "int64", 3).locked(),
        ];
        order_columns(&mut cols);
        let names: Vec<&str> = cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_ensure_index_column() {
        let mut cols = vec![Column::new("a", "int64", 0), Column::new("b", "object", 1)];
        ensure_index_column(&mut cols);
        order_columns(&mut cols);
        let names: Vec<&str> = cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec![INDEX_COLUMN, "a", "b"]);
        assert!(cols[0].locked);

        let mut cols = vec![
            Column::new("x", "int64", 0).locked(),
            Column::new(INDEX_COLUMN, "int64", 0),
        ];
        ensure_index_column(&mut cols);
        order_columns(&mut cols);
        let names: Vec<&str> = cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec![INDEX_COLUMN, "x"]);
        assert_eq!(cols.len(), 2);
    }

    #[test]
    fn test_active_columns_skips_hidden() {
        let mut hidden = Column::new("b", "int64", 1);
        hidden.visible = false;
        let cols = vec![
            Column::new("a", "int64", 0),
            hidden,
            Column::new(INDEX_COLUMN, "int64", 0).locked(),
        ];
        let names: Vec<&str> = active_columns(&cols)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec![INDEX_COLUMN, "a"]);
        assert_eq!(locked_count(&cols), 1);
    }

    #[test]
    fn test_sort_info_shape() {
        let sort: SortInfo = vec![("a".to_string(), SortDirection::Descending)];
        assert_eq!(serde_json::to_string(&sort).unwrap(), r#"[["a","DESC"]]"#);
        assert_eq!(sort_for("a", &sort), Some(&SortDirection::Descending));
        assert_eq!(sort_for("b", &sort), None);
    }
}

//! Loaded rows, keyed by zero-based data row index.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::background::{BackgroundResolver, CellStyle};
use crate::column::{Column, ColumnType};

#[derive(Debug, Clone, PartialEq)]
pub struct CellValue {
    pub raw: Value,
    pub view: String,
    pub style: CellStyle,
}

impl CellValue {
    pub fn plain(raw: Value, view: String) -> Self {
        Self {
            raw,
            view,
            style: CellStyle::none(),
        }
    }

    /// Raw value as clipboard text. Strings are unquoted, null is empty.
    pub fn raw_text(&self) -> String {
        match &self.raw {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

pub type RowRecord = HashMap<String, CellValue>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataPage {
    rows: BTreeMap<usize, RowRecord>,
}

impl DataPage {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.rows.contains_key(&row)
    }

    pub fn row(&self, row: usize) -> Option<&RowRecord> {
        self.rows.get(&row)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.rows.get(&row)?.get(column)
    }

    pub fn insert(&mut self, row: usize, record: RowRecord) {
        self.rows.insert(row, record);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Loaded row indexes in ascending order.
    pub fn row_indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.keys().copied()
    }

    pub fn records(&self) -> impl Iterator<Item = (&usize, &RowRecord)> {
        self.rows.iter()
    }

    /// Merge backend rows (`{"<row>": {"<column>": raw}}`) into the page,
    /// formatting each value for display. Unparseable row keys are skipped.
    pub fn merge_results(
        &mut self,
        results: &BTreeMap<String, serde_json::Map<String, Value>>,
        columns: &[Column],
        float_precision: usize,
    ) -> usize {
        let types: HashMap<&str, ColumnType> = columns
            .iter()
            .map(|c| (c.name.as_str(), c.column_type()))
            .collect();
        let mut merged = 0;
        for (key, values) in results {
            let Ok(row) = key.trim().parse::<usize>() else {
                log::warn!("Skipping row with non-numeric key '{}'", key);
                continue;
            };
            let record: RowRecord = values
                .iter()
                .map(|(name, raw)| {
                    let column_type = types
                        .get(name.as_str())
                        .copied()
                        .unwrap_or(ColumnType::Unknown);
                    let view = format_value(raw, column_type, float_precision);
                    (name.clone(), CellValue::plain(raw.clone(), view))
                })
                .collect();
            self.rows.insert(row, record);
            merged += 1;
        }
        merged
    }

    /// Recompute every cached cell's style under `resolver`.
    pub fn restyle(&mut self, columns: &[Column], resolver: &mut BackgroundResolver<'_>) {
        let by_name: HashMap<&str, &Column> =
            columns.iter().map(|c| (c.name.as_str(), c)).collect();
        for record in self.rows.values_mut() {
            for (name, cell) in record.iter_mut() {
                cell.style = match by_name.get(name.as_str()) {
                    Some(column) => resolver.resolve(column, cell),
                    None => CellStyle::none(),
                };
            }
        }
    }

    /// Keep at most `limit` rows, dropping those farthest from `[start, end]`.
    /// Returns the number of rows evicted.
    pub fn evict_outside(&mut self, start: usize, end: usize, limit: usize) -> usize {
        if limit == 0 || self.rows.len() <= limit {
            return 0;
        }
        let distance = |row: usize| {
            if row < start {
                start - row
            } else {
                row.saturating_sub(end)
            }
        };
        let mut by_distance: Vec<usize> = self.rows.keys().copied().collect();
        by_distance.sort_by_key(|r| std::cmp::Reverse(distance(*r)));
        let excess = self.rows.len() - limit;
        for row in by_distance.into_iter().take(excess) {
            self.rows.remove(&row);
        }
        excess
    }
}

/// Display text for a raw value.
pub fn format_value(raw: &Value, column_type: ColumnType, float_precision: usize) -> String {
    match raw {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if column_type == ColumnType::Float || (n.is_f64() && column_type != ColumnType::Int) {
                match n.as_f64() {
                    Some(f) if f.is_finite() => format!("{:.*}", float_precision, f),
                    _ => n.to_string(),
                }
            } else {
                n.to_string()
            }
        }
        Value::String(s) => {
            if column_type == ColumnType::Float {
                if let Ok(f) = s.parse::<f64>() {
                    if f.is_finite() {
                        return format!("{:.*}", float_precision, f);
                    }
                }
            }
            s.clone()
        }
        other => other.to_string(),
    }
}

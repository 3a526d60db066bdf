#![allow(dead_code)]

use color_eyre::eyre::eyre;
use color_eyre::Result;
use dtgrid::client::{
    DataResponse, DataSource, DtypesResponse, LockAction, MoveAction, ServerError, Settings,
};
use dtgrid::column::{Column, INDEX_COLUMN};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-process backend serving `total` rows of columns `a` (int) and `b`
/// (string). Records every call.
pub struct FakeSource {
    pub total: usize,
    pub fail_fetch: bool,
    pub fetches: Mutex<Vec<Vec<String>>>,
    pub settings: Mutex<Vec<Settings>>,
    pub visibility: Mutex<Vec<BTreeMap<String, bool>>>,
}

impl FakeSource {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            fail_fetch: false,
            fetches: Mutex::new(Vec::new()),
            settings: Mutex::new(Vec::new()),
            visibility: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(total: usize) -> Self {
        Self {
            fail_fetch: true,
            ..Self::new(total)
        }
    }

    pub fn fetched(&self) -> Vec<Vec<String>> {
        self.fetches.lock().unwrap().clone()
    }
}

/// `/dtale/dtypes` lists only the data columns; the index is not locked or
/// even present.
pub fn dtypes() -> Vec<Column> {
    vec![
        Column::new("a", "int64", 0).with_range(0.0, 9990.0),
        Column::new("b", "object", 1),
    ]
}

/// Columns as a `/dtale/data` response reports them.
pub fn data_columns() -> Vec<Column> {
    let mut columns = vec![Column::new(INDEX_COLUMN, "int64", 0)];
    columns.extend(dtypes());
    columns
}

/// Rows named by `"a-b"` / `"a"` range strings.
pub fn expand_ranges(ids: &[String]) -> Vec<usize> {
    ids.iter()
        .flat_map(|id| match id.split_once('-') {
            Some((start, end)) => {
                let start: usize = start.parse().unwrap();
                let end: usize = end.parse().unwrap();
                (start..=end).collect::<Vec<_>>()
            }
            None => vec![id.parse().unwrap()],
        })
        .collect()
}

pub fn rows_response(rows: &[usize], total: usize) -> DataResponse {
    let results = rows
        .iter()
        .filter(|r| **r < total)
        .map(|r| {
            let mut m = serde_json::Map::new();
            m.insert(INDEX_COLUMN.to_string(), json!(r));
            m.insert("a".to_string(), json!(r * 10));
            m.insert("b".to_string(), json!(format!("row{}", r)));
            (r.to_string(), m)
        })
        .collect();
    DataResponse {
        results,
        columns: data_columns(),
        total,
        final_query: None,
    }
}

impl DataSource for FakeSource {
    fn fetch_rows(&self, ids: &[String]) -> Result<DataResponse> {
        self.fetches.lock().unwrap().push(ids.to_vec());
        if self.fail_fetch {
            return Err(ServerError {
                error: "KeyError: 'a'".to_string(),
                traceback: Some("Traceback (most recent call last):\n  ...".to_string()),
            }
            .into());
        }
        Ok(rows_response(&expand_ranges(ids), self.total))
    }

    fn fetch_dtypes(&self) -> Result<DtypesResponse> {
        Ok(DtypesResponse { dtypes: dtypes() })
    }

    fn update_settings(&self, settings: &Settings) -> Result<()> {
        self.settings.lock().unwrap().push(settings.clone());
        Ok(())
    }

    fn update_visibility(&self, visibility: &BTreeMap<String, bool>) -> Result<()> {
        self.visibility.lock().unwrap().push(visibility.clone());
        Ok(())
    }

    fn update_locked(&self, _action: LockAction, _column: &str) -> Result<()> {
        Ok(())
    }

    fn update_column_position(&self, _action: MoveAction, column: &str) -> Result<()> {
        Err(eyre!("cannot move {}", column))
    }
}

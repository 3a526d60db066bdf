//! Cell, row and column selection.
//!
//! A selection is one of six mutually exclusive kinds. Every transition goes
//! through [`build_range_state`], which starts from an empty state and applies
//! exactly one [`Region`], so two kinds can never be active at once.

use crate::column::Column;
use crate::coord::{normalize, ordered, CellCoord};
use crate::page::DataPage;

/// A pair of endpoints in the order the user produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<T> {
    pub start: T,
    pub end: T,
}

impl<T: Copy> Span<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }

    pub fn single(at: T) -> Self {
        Self { start: at, end: at }
    }
}

impl Span<usize> {
    pub fn contains(&self, value: usize) -> bool {
        let (lo, hi) = ordered(self.start, self.end);
        value >= lo && value <= hi
    }
}

impl Span<CellCoord> {
    pub fn contains(&self, column: usize, row: usize) -> bool {
        let (lo, hi) = normalize(self.start, self.end);
        column >= lo.column && column <= hi.column && row >= lo.row && row <= hi.row
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub range_select: Option<Span<CellCoord>>,
    pub column_range: Option<Span<usize>>,
    pub row_range: Option<Span<usize>>,
    pub ctrl_cols: Option<Vec<usize>>,
    pub ctrl_rows: Option<Vec<usize>>,
    pub selected_row: Option<usize>,
}

/// The selection kind to apply on top of an empty state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    RangeSelect(Span<CellCoord>),
    ColumnRange(Span<usize>),
    RowRange(Span<usize>),
    CtrlCols(Vec<usize>),
    CtrlRows(Vec<usize>),
    SelectedRow(usize),
}

/// Phase of the rectangular range interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    RangeAnchored,
    RangeComplete,
    /// A row/column kind is active.
    Lines,
}

/// Fresh selection with every kind cleared, then `overrides` applied.
pub fn build_range_state(overrides: Option<Region>) -> SelectionState {
    let mut state = SelectionState::default();
    match overrides {
        None => {}
        Some(Region::RangeSelect(span)) => state.range_select = Some(span),
        Some(Region::ColumnRange(span)) => state.column_range = Some(span),
        Some(Region::RowRange(span)) => state.row_range = Some(span),
        Some(Region::CtrlCols(cols)) => state.ctrl_cols = Some(cols),
        Some(Region::CtrlRows(rows)) => state.ctrl_rows = Some(rows),
        Some(Region::SelectedRow(row)) => state.selected_row = Some(row),
    }
    state
}

/// Whether cell (`column`, `row`) is part of the active selection.
///
/// Runs for every visible cell on every redraw. Only one kind should be set,
/// but the checks still follow a fixed precedence.
pub fn is_in_range(column: usize, row: usize, state: &SelectionState) -> bool {
    if let Some(selected) = state.selected_row {
        return selected == row;
    }
    if let Some(span) = state.column_range {
        return span.contains(column);
    }
    if let Some(span) = state.row_range {
        return span.contains(row);
    }
    if let Some(rows) = &state.ctrl_rows {
        return rows.contains(&row);
    }
    if let Some(cols) = &state.ctrl_cols {
        return cols.contains(&column);
    }
    if let Some(span) = state.range_select {
        return span.contains(column, row);
    }
    false
}

/// [`is_in_range`] for a `"column|row"` key; malformed keys never match.
pub fn is_in_range_key(key: &str, state: &SelectionState) -> bool {
    match CellCoord::parse(key) {
        Some(cell) => is_in_range(cell.column, cell.row, state),
        None => false,
    }
}

/// Add `value` if absent (appended), remove it if present.
pub fn toggle_selection(list: &[usize], value: usize) -> Vec<usize> {
    if list.contains(&value) {
        list.iter().copied().filter(|v| *v != value).collect()
    } else {
        let mut out = list.to_vec();
        out.push(value);
        out
    }
}

impl SelectionState {
    pub fn is_empty(&self) -> bool {
        *self == SelectionState::default()
    }

    pub fn phase(&self) -> SelectionPhase {
        match self.range_select {
            Some(span) if span.start == span.end => SelectionPhase::RangeAnchored,
            Some(_) => SelectionPhase::RangeComplete,
            None if self.is_empty() => SelectionPhase::Idle,
            None => SelectionPhase::Lines,
        }
    }

    /// Anchor a new rectangular range at `cell`.
    pub fn anchor(cell: CellCoord) -> Self {
        build_range_state(Some(Region::RangeSelect(Span::single(cell))))
    }

    /// Move the free end of the rectangular range to `cell`, anchoring at
    /// `anchor` when no range is active yet.
    pub fn extend_range(&self, anchor: CellCoord, cell: CellCoord) -> Self {
        let start = self.range_select.map(|s| s.start).unwrap_or(anchor);
        build_range_state(Some(Region::RangeSelect(Span::new(start, cell))))
    }

    pub fn extend_column_range(&self, anchor: usize, column: usize) -> Self {
        let start = self.column_range.map(|s| s.start).unwrap_or(anchor);
        build_range_state(Some(Region::ColumnRange(Span::new(start, column))))
    }

    pub fn extend_row_range(&self, anchor: usize, row: usize) -> Self {
        let start = self.row_range.map(|s| s.start).unwrap_or(anchor);
        build_range_state(Some(Region::RowRange(Span::new(start, row))))
    }

    /// Ctrl-click on a column. Emptying the list returns to idle.
    pub fn toggle_column(&self, column: usize) -> Self {
        let current = self.ctrl_cols.as_deref().unwrap_or(&[]);
        let cols = toggle_selection(current, column);
        if cols.is_empty() {
            build_range_state(None)
        } else {
            build_range_state(Some(Region::CtrlCols(cols)))
        }
    }

    pub fn toggle_row(&self, row: usize) -> Self {
        let current = self.ctrl_rows.as_deref().unwrap_or(&[]);
        let rows = toggle_selection(current, row);
        if rows.is_empty() {
            build_range_state(None)
        } else {
            build_range_state(Some(Region::CtrlRows(rows)))
        }
    }
}

/// Clipboard payload: one header per copied column and the cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPayload {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CopyPayload {
    /// Tab-separated cells, newline-separated rows, optional header line.
    pub fn text(&self, include_headers: bool) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.rows.len() + 1);
        if include_headers {
            lines.push(self.headers.join("\t"));
        }
        lines.extend(self.rows.iter().map(|row| row.join("\t")));
        lines.join("\n")
    }

    pub fn cell_count(&self) -> usize {
        self.rows.len() * self.headers.len()
    }
}

/// Resolve the selection into copy text using the loaded rows.
///
/// `columns` is the render order (index column first). Header row and index
/// column are never copied; rows that are not loaded are skipped.
pub fn build_copy_payload(
    state: &SelectionState,
    columns: &[&Column],
    page: &DataPage,
) -> Option<CopyPayload> {
    let data_cols: Vec<usize> = (1..columns.len()).collect();
    let loaded_rows: Vec<usize> = page.row_indexes().map(|r| r + 1).collect();

    let (cols, rows): (Vec<usize>, Vec<usize>) = if let Some(row) = state.selected_row {
        (data_cols, vec![row])
    } else if let Some(span) = state.column_range {
        let (lo, hi) = ordered(span.start, span.end);
        (clamp_span(lo, hi, columns.len()), loaded_rows)
    } else if let Some(span) = state.row_range {
        let (lo, hi) = ordered(span.start, span.end);
        (data_cols, (lo.max(1)..=hi).collect())
    } else if let Some(rows) = &state.ctrl_rows {
        let mut rows = rows.clone();
        rows.sort_unstable();
        (data_cols, rows)
    } else if let Some(cols) = &state.ctrl_cols {
        let mut cols: Vec<usize> = cols
            .iter()
            .copied()
            .filter(|c| *c > 0 && *c < columns.len())
            .collect();
        cols.sort_unstable();
        (cols, loaded_rows)
    } else if let Some(span) = state.range_select {
        let (lo, hi) = normalize(span.start, span.end);
        (
            clamp_span(lo.column, hi.column, columns.len()),
            (lo.row.max(1)..=hi.row).collect(),
        )
    } else {
        return None;
    };

    if cols.is_empty() {
        return None;
    }

    let headers: Vec<String> = cols.iter().map(|c| columns[*c].name.clone()).collect();
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .filter(|r| *r > 0)
        .filter_map(|r| page.row(r - 1))
        .map(|record| {
            cols.iter()
                .map(|c| {
                    record
                        .get(&columns[*c].name)
                        .map(|cell| cell.raw_text())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    if rows.is_empty() {
        return None;
    }
    Some(CopyPayload { headers, rows })
}

fn clamp_span(lo: usize, hi: usize, len: usize) -> Vec<usize> {
    let hi = hi.min(len.saturating_sub(1));
    (lo.max(1)..=hi).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::CellValue;
    use serde_json::json;

    fn coord(c: usize, r: usize) -> CellCoord {
        CellCoord::new(c, r)
    }

    #[test]
    fn test_build_range_state_clears_other_kinds() {
        let span = Span::new(2, 5);
        let state = build_range_state(Some(Region::RowRange(span)));
        assert_eq!(
            state,
            SelectionState {
                row_range: Some(span),
                column_range: None,
                range_select: None,
                ctrl_rows: None,
                ctrl_cols: None,
                selected_row: None,
            }
        );
        assert_eq!(state, build_range_state(Some(Region::RowRange(span))));
        assert!(build_range_state(None).is_empty());
    }

    #[test]
    fn test_toggle_selection_preserves_order() {
        assert_eq!(toggle_selection(&[1, 3, 5], 3), vec![1, 5]);
        assert_eq!(toggle_selection(&[1, 5], 3), vec![1, 5, 3]);
        assert_eq!(toggle_selection(&[], 7), vec![7]);
    }

    #[test]
    fn test_is_in_range_rectangle_normalized() {
        let state = build_range_state(Some(Region::RangeSelect(Span::new(
            coord(4, 9),
            coord(2, 3),
        ))));
        for c in 0..7 {
            for r in 0..12 {
                let expected = (2..=4).contains(&c) && (3..=9).contains(&r);
                assert_eq!(is_in_range(c, r, &state), expected, "cell {}|{}", c, r);
            }
        }
    }

    #[test]
    fn test_is_in_range_lines() {
        let cols = build_range_state(Some(Region::ColumnRange(Span::new(5, 3))));
        assert!(is_in_range(4, 100, &cols));
        assert!(!is_in_range(6, 1, &cols));

        let rows = build_range_state(Some(Region::RowRange(Span::new(7, 7))));
        assert!(is_in_range(1, 7, &rows));
        assert!(!is_in_range(1, 8, &rows));

        let ctrl = build_range_state(Some(Region::CtrlRows(vec![2, 9])));
        assert!(is_in_range(3, 9, &ctrl));
        assert!(!is_in_range(3, 5, &ctrl));

        let ctrl = build_range_state(Some(Region::CtrlCols(vec![1, 4])));
        assert!(is_in_range(4, 2, &ctrl));
        assert!(!is_in_range(2, 2, &ctrl));

        let selected = build_range_state(Some(Region::SelectedRow(3)));
        assert!(is_in_range(8, 3, &selected));
        assert!(!is_in_range(8, 4, &selected));
    }

    #[test]
    fn test_is_in_range_precedence_when_several_set() {
        let state = SelectionState {
            selected_row: Some(2),
            column_range: Some(Span::new(1, 3)),
            ..Default::default()
        };
        assert!(is_in_range(9, 2, &state));
        assert!(!is_in_range(2, 5, &state));
    }

    #[test]
    fn test_is_in_range_key_malformed() {
        let state = build_range_state(Some(Region::CtrlCols(vec![1])));
        assert!(is_in_range_key("1|4", &state));
        assert!(!is_in_range_key("14", &state));
        assert!(!is_in_range_key("x|y", &state));
        assert!(!is_in_range_key("", &state));
    }

    #[test]
    fn test_phase_transitions() {
        let idle = build_range_state(None);
        assert_eq!(idle.phase(), SelectionPhase::Idle);

        let anchored = SelectionState::anchor(coord(2, 3));
        assert_eq!(anchored.phase(), SelectionPhase::RangeAnchored);

        let complete = anchored.extend_range(coord(9, 9), coord(4, 6));
        assert_eq!(complete.phase(), SelectionPhase::RangeComplete);
        assert_eq!(complete.range_select.unwrap().start, coord(2, 3));

        let cols = complete.toggle_column(3);
        assert_eq!(cols.phase(), SelectionPhase::Lines);
        assert!(cols.range_select.is_none());
        assert_eq!(cols.toggle_column(3).phase(), SelectionPhase::Idle);
    }

    fn sample() -> (Vec<Column>, DataPage) {
        let columns = vec![
            Column::new(crate::column::INDEX_COLUMN, "int64", 0),
            Column::new("a", "int64", 1),
            Column::new("b", "object", 2),
            Column::new("c", "float64", 3),
        ];
        let mut page = DataPage::default();
        for r in 0..4usize {
            let mut record = std::collections::HashMap::new();
            record.insert("a".to_string(), CellValue::plain(json!(r), r.to_string()));
            record.insert(
                "b".to_string(),
                CellValue::plain(json!(format!("s{}", r)), format!("s{}", r)),
            );
            record.insert(
                "c".to_string(),
                CellValue::plain(json!(r as f64 / 2.0), format!("{:.2}", r as f64 / 2.0)),
            );
            page.insert(r, record);
        }
        (columns, page)
    }

    #[test]
    fn test_copy_rectangle_from_reversed_corners() {
        let (columns, page) = sample();
        let cols: Vec<&Column> = columns.iter().collect();
        let state = SelectionState::anchor(coord(2, 3)).extend_range(coord(2, 3), coord(1, 2));
        let payload = build_copy_payload(&state, &cols, &page).unwrap();
        assert_eq!(payload.headers, vec!["a", "b"]);
        assert_eq!(payload.text(false), "1\ts1\n2\ts2");
        assert_eq!(payload.text(true), "a\tb\n1\ts1\n2\ts2");
        assert_eq!(payload.cell_count(), 4);
    }

    #[test]
    fn test_copy_columns_and_rows() {
        let (columns, page) = sample();
        let cols: Vec<&Column> = columns.iter().collect();

        let state = build_range_state(Some(Region::CtrlCols(vec![3, 1])));
        let payload = build_copy_payload(&state, &cols, &page).unwrap();
        assert_eq!(payload.headers, vec!["a", "c"]);
        assert_eq!(payload.rows.len(), 4);
        assert_eq!(payload.rows[3], vec!["3", "1.5"]);

        let state = build_range_state(Some(Region::RowRange(Span::new(4, 3))));
        let payload = build_copy_payload(&state, &cols, &page).unwrap();
        assert_eq!(payload.headers, vec!["a", "b", "c"]);
        assert_eq!(payload.text(false), "2\ts2\t1.0\n3\ts3\t1.5");
    }

    #[test]
    fn test_copy_skips_unloaded_rows_and_sentinels() {
        let (columns, page) = sample();
        let cols: Vec<&Column> = columns.iter().collect();
        let state = SelectionState::anchor(coord(0, 0)).extend_range(coord(0, 0), coord(1, 40));
        let payload = build_copy_payload(&state, &cols, &page).unwrap();
        assert_eq!(payload.headers, vec!["a"]);
        assert_eq!(payload.rows.len(), 4);

        let empty = build_range_state(None);
        assert!(build_copy_payload(&empty, &cols, &page).is_none());
    }
}

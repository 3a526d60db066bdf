//! Grid view-state and its reducer.
//!
//! All state changes go through [`reduce`]. Work that has to leave the
//! process (row fetches, settings updates) is queued on
//! [`GridState::effects`] for the caller to drain; the reducer never performs
//! I/O itself.

use std::collections::BTreeMap;

use crate::background::{BackgroundMode, BackgroundResolver, RangeRules};
use crate::client::{DataResponse, LockAction, MoveAction, Settings};
use crate::column::{
    active_columns, ensure_index_column, locked_count, order_columns, Column, SortDirection,
    SortInfo,
};
use crate::coord::CellCoord;
use crate::page::DataPage;
use crate::paging::{request_window, FetchRequest, Pager, RowWindow};
use crate::selection::SelectionState;
use crate::sizing::{auto_size, auto_size_all, total_visible_width, SizingOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOptions {
    pub page_size: usize,
    pub sizing: SizingOptions,
    pub cell_padding: u16,
    pub float_precision: usize,
    /// 0 keeps every loaded row.
    pub max_cached_rows: usize,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            page_size: 56,
            sizing: SizingOptions::default(),
            cell_padding: 1,
            float_precision: 2,
            max_cached_rows: 0,
        }
    }
}

/// Work for the backend, executed in order by the loader.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchDtypes,
    Fetch(FetchRequest),
    UpdateSettings(Settings),
    UpdateVisibility(BTreeMap<String, bool>),
    UpdateLocked(LockAction, String),
    MoveColumn(MoveAction, String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridAction {
    /// Replace the column set (dtype metadata from the backend).
    SetColumns(Vec<Column>),
    /// Viewport size in data rows and terminal cells.
    SetViewport { rows: usize, width: u16 },
    ScrollTo(usize),
    ScrollBy(isize),
    MoveCursor { columns: isize, rows: isize },
    SetCursor(CellCoord),
    SetSelection(SelectionState),
    ClearSelection,
    ToggleColumnVisibility(String),
    UnhideAll,
    Lock(String),
    Unlock(String),
    MoveColumn(String, MoveAction),
    ResizeColumn(String, i32),
    /// Auto-size one column, or every column when None.
    AutoSize(Option<String>),
    SetBackgroundMode(Option<BackgroundMode>),
    SetRangeRules(RangeRules),
    /// Cycle the sort on a column: ascending, descending, none.
    CycleSort(String),
    SetSort(SortInfo),
    /// Drop everything loaded and start over.
    Refresh,
    DataReceived {
        generation: u64,
        response: DataResponse,
    },
    FetchFailed {
        generation: u64,
        error: String,
        traceback: Option<String>,
    },
    /// Report an error that is not tied to a row fetch.
    ShowError {
        error: String,
        traceback: Option<String>,
    },
    DismissError,
}

impl GridAction {
    /// Variant name, for the debug overlay.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetColumns(_) => "SetColumns",
            Self::SetViewport { .. } => "SetViewport",
            Self::ScrollTo(_) => "ScrollTo",
            Self::ScrollBy(_) => "ScrollBy",
            Self::MoveCursor { .. } => "MoveCursor",
            Self::SetCursor(_) => "SetCursor",
            Self::SetSelection(_) => "SetSelection",
            Self::ClearSelection => "ClearSelection",
            Self::ToggleColumnVisibility(_) => "ToggleColumnVisibility",
            Self::UnhideAll => "UnhideAll",
            Self::Lock(_) => "Lock",
            Self::Unlock(_) => "Unlock",
            Self::MoveColumn(..) => "MoveColumn",
            Self::ResizeColumn(..) => "ResizeColumn",
            Self::AutoSize(_) => "AutoSize",
            Self::SetBackgroundMode(_) => "SetBackgroundMode",
            Self::SetRangeRules(_) => "SetRangeRules",
            Self::CycleSort(_) => "CycleSort",
            Self::SetSort(_) => "SetSort",
            Self::Refresh => "Refresh",
            Self::DataReceived { .. } => "DataReceived",
            Self::FetchFailed { .. } => "FetchFailed",
            Self::ShowError { .. } => "ShowError",
            Self::DismissError => "DismissError",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    pub options: GridOptions,
    pub columns: Vec<Column>,
    pub data: DataPage,
    /// Total rows reported by the backend.
    pub total: usize,
    pub selection: SelectionState,
    /// Column is an index into the active columns, row is 1-based.
    pub cursor: CellCoord,
    /// First visible data row (zero-based).
    pub top_row: usize,
    /// First scrollable (non-locked) active column shown.
    pub left_column: usize,
    pub viewport_rows: usize,
    pub viewport_width: u16,
    pub background_mode: Option<BackgroundMode>,
    pub range_rules: RangeRules,
    pub sort_info: SortInfo,
    pub pager: Pager,
    pub error: Option<String>,
    pub traceback: Option<String>,
    /// Bumped whenever column geometry changes; views re-layout when it moves.
    pub layout_epoch: u64,
    pub effects: Vec<Effect>,
}

impl GridState {
    pub fn new(options: GridOptions) -> Self {
        Self {
            options,
            columns: Vec::new(),
            data: DataPage::default(),
            total: 0,
            selection: SelectionState::default(),
            cursor: CellCoord::new(1, 1),
            top_row: 0,
            left_column: 0,
            viewport_rows: 0,
            viewport_width: 0,
            background_mode: None,
            range_rules: RangeRules::default(),
            sort_info: SortInfo::new(),
            pager: Pager::new(options.page_size),
            error: None,
            traceback: None,
            layout_epoch: 0,
            effects: Vec::new(),
        }
    }

    pub fn active_columns(&self) -> Vec<&Column> {
        active_columns(&self.columns)
    }

    pub fn locked_count(&self) -> usize {
        locked_count(&self.columns)
    }

    /// Active column under the cursor.
    pub fn cursor_column(&self) -> Option<&Column> {
        self.active_columns().get(self.cursor.column).copied()
    }

    pub fn settings(&self) -> Settings {
        Settings {
            sort_info: self.sort_info.clone(),
            background_mode: self.background_mode.map(|m| m.as_str().to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pager.in_flight().is_some()
    }

    fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    fn visible_width(&self) -> u32 {
        total_visible_width(&self.columns, self.options.cell_padding)
    }

    /// Ask for the rows around `top_row`, queueing a fetch if any are missing.
    fn request_rows(&mut self) {
        let window = if self.total == 0 && self.pager.loaded().is_none() {
            Some(RowWindow::new(0, self.options.page_size.max(1) - 1))
        } else {
            request_window(self.top_row, self.options.page_size, self.total)
        };
        if let Some(window) = window {
            if let Some(request) = self.pager.request(window, &self.data) {
                self.effects.push(Effect::Fetch(request));
            }
        }
    }

    fn restyle(&mut self) {
        let mut resolver =
            BackgroundResolver::new(self.background_mode, &self.columns, &self.range_rules);
        self.data.restyle(&self.columns, &mut resolver);
    }

    /// Run `f` and bump the layout epoch if total visible width changed.
    fn with_relayout(&mut self, f: impl FnOnce(&mut Self)) {
        let before = self.visible_width();
        f(self);
        if self.visible_width() != before {
            self.layout_epoch += 1;
        }
    }

    fn invalidate(&mut self) {
        self.pager.invalidate();
        self.data.clear();
        self.selection = SelectionState::default();
        self.top_row = 0;
        self.cursor.row = 1;
    }

    fn clamp_cursor(&mut self) {
        let cols = self.active_columns().len();
        self.cursor.column = self.cursor.column.min(cols.saturating_sub(1));
        self.cursor.row = self.cursor.row.clamp(1, self.total.max(1));
    }

    fn scroll_to(&mut self, top: usize) {
        let max_top = self.total.saturating_sub(self.viewport_rows.max(1));
        self.top_row = top.min(max_top);
        self.request_rows();
    }

    /// Scroll so the cursor row and column are on screen.
    fn follow_cursor(&mut self) {
        let row = self.cursor.row.saturating_sub(1);
        let rows = self.viewport_rows.max(1);
        let top = if row < self.top_row {
            row
        } else if row >= self.top_row + rows {
            row + 1 - rows
        } else {
            self.top_row
        };
        if top != self.top_row {
            self.scroll_to(top);
        }
        self.follow_cursor_column();
    }

    fn follow_cursor_column(&mut self) {
        let locked = self.locked_count();
        let col = self.cursor.column;
        if col < locked {
            return;
        }
        let left = self.left_column.max(locked);
        if col < left {
            self.left_column = col;
            return;
        }
        let active = self.active_columns();
        if col >= active.len() {
            return;
        }
        let padding = self.options.cell_padding as u32;
        let locked_width: u32 = active[..locked]
            .iter()
            .map(|c| c.width as u32 + padding)
            .sum();
        let available = (self.viewport_width as u32).saturating_sub(locked_width);
        let mut start = left;
        loop {
            let used: u32 = active[start..=col]
                .iter()
                .map(|c| c.width as u32 + padding)
                .sum();
            if used <= available || start >= col {
                break;
            }
            start += 1;
        }
        self.left_column = start;
    }
}

/// Apply `action` to `state`.
pub fn reduce(mut state: GridState, action: GridAction) -> GridState {
    match action {
        GridAction::SetColumns(mut columns) => {
            ensure_index_column(&mut columns);
            order_columns(&mut columns);
            let sizing = state.options.sizing;
            auto_size_all(&mut columns, &state.data, sizing);
            state.columns = columns;
            state.left_column = state.left_column.max(state.locked_count());
            state.layout_epoch += 1;
            state.restyle();
            state.clamp_cursor();
        }
        GridAction::SetViewport { rows, width } => {
            state.viewport_rows = rows;
            state.viewport_width = width;
            let top = state.top_row;
            state.scroll_to(top);
            state.follow_cursor_column();
        }
        GridAction::ScrollTo(top) => state.scroll_to(top),
        GridAction::ScrollBy(delta) => {
            let top = state.top_row.saturating_add_signed(delta);
            state.scroll_to(top);
        }
        GridAction::MoveCursor { columns, rows } => {
            state.cursor.column = state.cursor.column.saturating_add_signed(columns);
            state.cursor.row = state.cursor.row.saturating_add_signed(rows);
            state.clamp_cursor();
            state.follow_cursor();
        }
        GridAction::SetCursor(cell) => {
            state.cursor = cell;
            state.clamp_cursor();
            state.follow_cursor();
        }
        GridAction::SetSelection(selection) => state.selection = selection,
        GridAction::ClearSelection => state.selection = SelectionState::default(),
        GridAction::ToggleColumnVisibility(name) => {
            let Some(column) = state.column_mut(&name) else {
                return state;
            };
            if column.is_index() {
                return state;
            }
            column.visible = !column.visible;
            state.layout_epoch += 1;
            state.selection = SelectionState::default();
            state.clamp_cursor();
            state.effects.push(Effect::UpdateVisibility(visibility(&state.columns)));
        }
        GridAction::UnhideAll => {
            if state.columns.iter().all(|c| c.visible) {
                return state;
            }
            state.columns.iter_mut().for_each(|c| c.visible = true);
            state.layout_epoch += 1;
            state.selection = SelectionState::default();
            state.effects.push(Effect::UpdateVisibility(visibility(&state.columns)));
        }
        GridAction::Lock(name) => set_locked(&mut state, &name, true),
        GridAction::Unlock(name) => set_locked(&mut state, &name, false),
        GridAction::MoveColumn(name, action) => {
            if move_column(&mut state.columns, &name, action) {
                state.layout_epoch += 1;
                state.selection = SelectionState::default();
                let pos = state.active_columns().iter().position(|c| c.name == name);
                if let Some(pos) = pos {
                    state.cursor.column = pos;
                }
                state.follow_cursor_column();
                state.effects.push(Effect::MoveColumn(action, name));
            }
        }
        GridAction::ResizeColumn(name, delta) => {
            let min = state.options.sizing.min_width as i32;
            state.with_relayout(|s| {
                if let Some(column) = s.column_mut(&name) {
                    column.width = (column.width as i32 + delta).clamp(min, u16::MAX as i32) as u16;
                    column.manual_width = true;
                }
            });
            state.follow_cursor_column();
        }
        GridAction::AutoSize(name) => {
            let sizing = state.options.sizing;
            state.with_relayout(|s| {
                let GridState { columns, data, .. } = s;
                for column in columns
                    .iter_mut()
                    .filter(|c| name.as_ref().map_or(true, |n| *n == c.name))
                {
                    column.manual_width = false;
                    auto_size(column, data, sizing);
                }
            });
        }
        GridAction::SetBackgroundMode(mode) => {
            if state.background_mode != mode {
                state.background_mode = mode;
                state.restyle();
                let settings = state.settings();
                state.effects.push(Effect::UpdateSettings(settings));
            }
        }
        GridAction::SetRangeRules(rules) => {
            state.range_rules = rules;
            state.restyle();
        }
        GridAction::CycleSort(name) => {
            let next = match crate::column::sort_for(&name, &state.sort_info) {
                None => vec![(name, SortDirection::Ascending)],
                Some(SortDirection::Ascending) => vec![(name, SortDirection::Descending)],
                Some(SortDirection::Descending) => Vec::new(),
            };
            return reduce(state, GridAction::SetSort(next));
        }
        GridAction::SetSort(sort_info) => {
            state.sort_info = sort_info;
            let settings = state.settings();
            state.effects.push(Effect::UpdateSettings(settings));
            state.invalidate();
            state.request_rows();
        }
        GridAction::Refresh => {
            state.invalidate();
            state.effects.push(Effect::FetchDtypes);
            state.request_rows();
        }
        GridAction::DataReceived {
            generation,
            response,
        } => {
            if !state.pager.complete(generation) {
                return state;
            }
            state.error = None;
            state.traceback = None;
            state.total = response.total;
            if state.columns.is_empty() && !response.columns.is_empty() {
                let mut columns = response.columns;
                ensure_index_column(&mut columns);
                order_columns(&mut columns);
                state.columns = columns;
                state.left_column = state.locked_count();
            }
            let precision = state.options.float_precision;
            state
                .data
                .merge_results(&response.results, &state.columns, precision);
            if let Some(window) = state.pager.loaded() {
                let limit = state.options.max_cached_rows;
                state.data.evict_outside(window.start, window.end, limit);
            }
            state.restyle();
            let sizing = state.options.sizing;
            state.with_relayout(|s| auto_size_all(&mut s.columns, &s.data, sizing));
            state.clamp_cursor();
            let top = state.top_row;
            state.top_row = top.min(state.total.saturating_sub(state.viewport_rows.max(1)));
            if let Some(next) = state.pager.next_request(&state.data) {
                state.effects.push(Effect::Fetch(next));
            }
        }
        GridAction::FetchFailed {
            generation,
            error,
            traceback,
        } => {
            if state.pager.fail(generation) {
                state.error = Some(error);
                state.traceback = traceback;
            }
        }
        GridAction::ShowError { error, traceback } => {
            state.error = Some(error);
            state.traceback = traceback;
        }
        GridAction::DismissError => {
            state.error = None;
            state.traceback = None;
        }
    }
    state
}

fn visibility(columns: &[Column]) -> BTreeMap<String, bool> {
    columns
        .iter()
        .map(|c| (c.name.clone(), c.visible))
        .collect()
}

fn set_locked(state: &mut GridState, name: &str, locked: bool) {
    let Some(column) = state.column_mut(name) else {
        return;
    };
    if column.is_index() || column.locked == locked {
        return;
    }
    column.locked = locked;
    order_columns(&mut state.columns);
    state.layout_epoch += 1;
    state.selection = SelectionState::default();
    state.left_column = state.locked_count();
    let pos = state.active_columns().iter().position(|c| c.name == name);
    if let Some(pos) = pos {
        state.cursor.column = pos;
    }
    let action = if locked {
        LockAction::Lock
    } else {
        LockAction::Unlock
    };
    state.effects.push(Effect::UpdateLocked(action, name.to_string()));
}

/// Move `name` within its lock group, skipping hidden neighbors. The index
/// column never moves. Returns false when nothing changed.
fn move_column(columns: &mut Vec<Column>, name: &str, action: MoveAction) -> bool {
    let Some(from) = columns.iter().position(|c| c.name == name) else {
        return false;
    };
    if columns[from].is_index() {
        return false;
    }
    let locked = columns[from].locked;
    let movable = |c: &Column| c.locked == locked && !c.is_index();
    let group: Vec<usize> = (0..columns.len()).filter(|i| movable(&columns[*i])).collect();
    let to = match action {
        MoveAction::Front => group.first().copied(),
        MoveAction::Back => group.last().copied(),
        MoveAction::Left => group
            .iter()
            .rev()
            .copied()
            .find(|i| *i < from && columns[*i].visible),
        MoveAction::Right => group
            .iter()
            .copied()
            .find(|i| *i > from && columns[*i].visible),
    };
    match to {
        Some(to) if to != from => {
            let column = columns.remove(from);
            columns.insert(to, column);
            true
        }
        _ => false,
    }
}

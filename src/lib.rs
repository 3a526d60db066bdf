use color_eyre::Result;
use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use ratatui::style::Style;
use ratatui::widgets::{Block, StatefulWidget};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

pub mod background;
pub mod cache;
pub mod cli;
pub mod client;
pub mod clipboard;
pub mod column;
pub mod config;
pub mod coord;
pub mod error_display;
mod help_strings;
pub mod loader;
pub mod page;
pub mod paging;
mod render;
pub mod selection;
pub mod sizing;
pub mod store;
pub mod widgets;

pub use cache::CacheManager;
pub use cli::Args;
pub use client::{DataSource, DtaleClient};
pub use config::{
    rgb_to_256_color, rgb_to_basic_ansi, AppConfig, ColorParser, ConfigManager, Theme,
};
pub use coord::CellCoord;
pub use store::{GridAction, GridOptions, GridState};

use background::BackgroundMode;
use client::DataResponse;
use column::Column;
use error_display::{user_message_from_report, FetchFailure};
use loader::Loader;
use render::context::RenderContext;
use render::layout::app_layout;
use selection::{build_copy_payload, build_range_state, CopyPayload, Region, SelectionState, Span};
use store::Effect;
use widgets::column_menu::{menu_actions, render_column_menu, ColumnMenu, MenuAction};
use widgets::controls::Controls;
use widgets::debug::DebugState;
use widgets::grid::{DataGrid, GridViewState};

/// Application name used for cache directory and other app-specific paths
pub const APP_NAME: &str = "dtgrid";

/// Rows moved per mouse wheel notch.
const WHEEL_ROWS: isize = 3;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16), // resized (width, height)
    /// Grid body size measured by the last draw.
    Viewport {
        rows: usize,
        width: u16,
    },
    ColumnsLoaded(Vec<Column>),
    RowsLoaded {
        generation: u64,
        response: DataResponse,
    },
    RowsFailed {
        generation: u64,
        failure: FetchFailure,
    },
    /// A settings/visibility/layout update the server rejected.
    BackendError(FetchFailure),
    Exit,
    Crash(String),
}

#[derive(Default)]
pub struct ConfirmationModal {
    pub active: bool,
    pub title: String,
    pub message: String,
    pub focus_yes: bool, // true = Yes focused, false = No focused
}

impl ConfirmationModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, title: &str, message: String) {
        self.active = true;
        self.title = title.to_string();
        self.message = message;
        self.focus_yes = true;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.title.clear();
        self.message.clear();
        self.focus_yes = true;
    }
}

#[derive(Default)]
pub struct ErrorModal {
    pub active: bool,
    pub message: String,
    /// Server traceback, scrollable.
    pub detail: Option<String>,
    pub scroll: usize,
}

impl ErrorModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: String) {
        self.show_with_detail(message, None);
    }

    pub fn show_with_detail(&mut self, message: String, detail: Option<String>) {
        self.active = true;
        self.message = message;
        self.detail = detail;
        self.scroll = 0;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
        self.detail = None;
        self.scroll = 0;
    }
}

pub struct App {
    pub grid: GridState,
    pub grid_view: GridViewState,
    events: Sender<AppEvent>,
    loader: Option<Loader>,
    colors: ColorParser,
    ctx: RenderContext,
    debug: DebugState,
    pub column_menu: ColumnMenu,
    pub show_help: bool,
    help_scroll: usize,
    pub confirmation_modal: ConfirmationModal,
    pub error_modal: ErrorModal,
    pending_copy: Option<CopyPayload>,
    copy_headers: bool,
    drag_anchor: Option<CellCoord>,
    initial_cell: Option<CellCoord>,
    default_background: Option<BackgroundMode>,
    reported_viewport: Option<(usize, u16)>,
    /// One-shot message for the control bar; cleared on the next key.
    status: Option<String>,
    throbber_frame: u8,
    unicode_throbber: bool,
}

impl App {
    pub fn new(events: Sender<AppEvent>) -> App {
        let theme = Theme::from_config(&AppConfig::default().theme).unwrap_or_else(|_| Theme {
            colors: std::collections::HashMap::new(),
        });
        Self::new_with_config(events, theme, AppConfig::default())
    }

    pub fn new_with_config(events: Sender<AppEvent>, theme: Theme, app_config: AppConfig) -> App {
        let mut grid = GridState::new(app_config.display.grid_options());
        grid.range_rules = app_config.highlight.clone();
        let ctx = RenderContext::from_theme(&theme);
        let debug = DebugState {
            enabled: app_config.debug.enabled,
            ..DebugState::default()
        };

        App {
            grid,
            grid_view: GridViewState::default(),
            events,
            loader: None,
            colors: ColorParser::new(),
            ctx,
            debug,
            column_menu: ColumnMenu::new(),
            show_help: false,
            help_scroll: 0,
            confirmation_modal: ConfirmationModal::new(),
            error_modal: ErrorModal::new(),
            pending_copy: None,
            copy_headers: true,
            drag_anchor: None,
            initial_cell: None,
            default_background: app_config.display.default_background,
            reported_viewport: None,
            status: None,
            throbber_frame: 0,
            unicode_throbber: locale_is_utf8(),
        }
    }

    /// Send backend effects to `loader` instead of dropping them.
    pub fn with_loader(mut self, loader: Loader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Apply the startup background mode and request the first page. The
    /// cursor moves to `initial_cell` once rows arrive.
    pub fn start(&mut self, initial_cell: Option<CellCoord>) {
        self.initial_cell = initial_cell;
        if let Some(mode) = self.default_background {
            self.dispatch(GridAction::SetBackgroundMode(Some(mode)));
        }
        self.dispatch(GridAction::Refresh);
    }

    pub fn is_busy(&self) -> bool {
        self.grid.is_loading()
    }

    /// Run `action` through the store and hand its effects to the loader.
    pub fn dispatch(&mut self, action: GridAction) {
        self.debug.last_action = action.name().to_string();
        let options = self.grid.options;
        let grid = std::mem::replace(&mut self.grid, GridState::new(options));
        self.grid = store::reduce(grid, action);
        let effects = std::mem::take(&mut self.grid.effects);
        for effect in effects {
            self.submit(effect);
        }
        self.debug.observe(&self.grid);
    }

    fn submit(&mut self, effect: Effect) {
        let Some(loader) = &self.loader else {
            log::debug!("No loader, dropping {:?}", effect);
            return;
        };
        if let Effect::Fetch(request) = &effect {
            log::debug!(
                "Fetch {:?} (generation {})",
                request.ranges,
                request.generation
            );
        }
        if let Err(e) = loader.submit(effect) {
            log::warn!("{:#}", e);
            self.error_modal.show(user_message_from_report(&e));
        }
    }

    /// Text the pending copy would put on the clipboard.
    pub fn pending_copy_text(&self) -> Option<String> {
        self.pending_copy
            .as_ref()
            .map(|payload| payload.text(self.copy_headers))
    }

    /// Resolve the selection and ask before copying it.
    fn request_copy(&mut self) {
        let payload = {
            let columns = self.grid.active_columns();
            build_copy_payload(&self.grid.selection, &columns, &self.grid.data)
        };
        let Some(payload) = payload else {
            return;
        };
        if payload.rows.is_empty() {
            self.status = Some("Selected rows are not loaded".to_string());
            return;
        }
        self.pending_copy = Some(payload);
        self.confirmation_modal
            .show("Copy to Clipboard", self.copy_prompt());
    }

    fn copy_prompt(&self) -> String {
        let Some(payload) = &self.pending_copy else {
            return String::new();
        };
        format!(
            "Copy {} cells ({} rows x {} columns) to the clipboard?\n\nHeaders: {} (h to toggle)",
            payload.cell_count(),
            payload.rows.len(),
            payload.headers.len(),
            if self.copy_headers { "included" } else { "excluded" },
        )
    }

    fn finish_copy(&mut self, confirmed: bool) {
        self.confirmation_modal.hide();
        if let Some(payload) = self.pending_copy.take() {
            if confirmed {
                match clipboard::copy_to_clipboard(&payload.text(self.copy_headers)) {
                    Ok(()) => {
                        self.status = Some(format!("Copied {} cells", payload.cell_count()))
                    }
                    Err(e) => {
                        log::warn!("Clipboard copy failed: {:#}", e);
                        self.error_modal.show(user_message_from_report(&e));
                    }
                }
            }
        }
        self.dispatch(GridAction::ClearSelection);
    }

    fn set_selection(&mut self, selection: SelectionState) {
        self.dispatch(GridAction::SetSelection(selection));
    }

    fn move_cursor(&mut self, columns: isize, rows: isize, extend: bool) {
        let anchor = self.grid.cursor;
        self.dispatch(GridAction::MoveCursor { columns, rows });
        if extend {
            let selection = self.grid.selection.extend_range(anchor, self.grid.cursor);
            self.set_selection(selection);
        } else if !self.grid.selection.is_empty() {
            self.dispatch(GridAction::ClearSelection);
        }
    }

    /// Dispatch the store actions for a column menu entry on the cursor column.
    fn column_action(&mut self, action: MenuAction) {
        let Some(column) = self.grid.cursor_column().cloned() else {
            return;
        };
        for action in menu_actions(action, &column, &self.grid) {
            self.dispatch(action);
        }
    }

    fn cursor_column_name(&self) -> Option<String> {
        self.grid.cursor_column().map(|c| c.name.clone())
    }

    fn show_traceback(&mut self) {
        if let Some(error) = &self.grid.error {
            self.error_modal
                .show_with_detail(error.clone(), self.grid.traceback.clone());
        }
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        self.debug.on_key(event);
        self.status = None;
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let shift = event.modifiers.contains(KeyModifiers::SHIFT);

        if ctrl && event.code == KeyCode::Char('c') {
            return Some(AppEvent::Exit);
        }

        if self.error_modal.active {
            match event.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => self.error_modal.hide(),
                KeyCode::Up | KeyCode::Char('k') => {
                    self.error_modal.scroll = self.error_modal.scroll.saturating_sub(1)
                }
                KeyCode::Down | KeyCode::Char('j') => self.error_modal.scroll += 1,
                _ => {}
            }
            return None;
        }

        if self.confirmation_modal.active {
            match event.code {
                KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
                    self.confirmation_modal.focus_yes = !self.confirmation_modal.focus_yes;
                }
                KeyCode::Char('h') => {
                    self.copy_headers = !self.copy_headers;
                    self.confirmation_modal.message = self.copy_prompt();
                }
                KeyCode::Char('y') => self.finish_copy(true),
                KeyCode::Char('n') | KeyCode::Esc => self.finish_copy(false),
                KeyCode::Enter => {
                    let confirmed = self.confirmation_modal.focus_yes;
                    self.finish_copy(confirmed);
                }
                _ => {}
            }
            return None;
        }

        if self.show_help {
            match event.code {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                    self.show_help = false;
                    self.help_scroll = 0;
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.help_scroll = self.help_scroll.saturating_sub(1)
                }
                KeyCode::Down | KeyCode::Char('j') => self.help_scroll += 1,
                KeyCode::PageUp => self.help_scroll = self.help_scroll.saturating_sub(10),
                KeyCode::PageDown => self.help_scroll += 10,
                _ => {}
            }
            return None;
        }

        if self.column_menu.active {
            match event.code {
                KeyCode::Up | KeyCode::Char('k') => self.column_menu.select_previous(),
                KeyCode::Down | KeyCode::Char('j') => self.column_menu.select_next(),
                KeyCode::Enter => {
                    let selected = self.column_menu.selected();
                    let column = self
                        .grid
                        .columns
                        .iter()
                        .find(|c| c.name == self.column_menu.column)
                        .cloned();
                    self.column_menu.close();
                    if let (Some(action), Some(column)) = (selected, column) {
                        for action in menu_actions(action, &column, &self.grid) {
                            self.dispatch(action);
                        }
                    }
                }
                KeyCode::Char('?') => self.show_help = true,
                KeyCode::Esc | KeyCode::Char('m') | KeyCode::Char('q') => {
                    self.column_menu.close()
                }
                _ => {}
            }
            return None;
        }

        match event.code {
            KeyCode::Char('q') => return Some(AppEvent::Exit),
            KeyCode::Char('r') if ctrl => self.dispatch(GridAction::Refresh),
            KeyCode::F(5) => self.dispatch(GridAction::Refresh),
            KeyCode::Up => self.move_cursor(0, -1, shift),
            KeyCode::Down => self.move_cursor(0, 1, shift),
            KeyCode::Left => self.move_cursor(-1, 0, shift),
            KeyCode::Right => self.move_cursor(1, 0, shift),
            KeyCode::Char('k') => self.move_cursor(0, -1, false),
            KeyCode::Char('j') => self.move_cursor(0, 1, false),
            KeyCode::Char('h') => self.move_cursor(-1, 0, false),
            KeyCode::Char('l') => self.move_cursor(1, 0, false),
            KeyCode::PageUp => {
                let rows = self.grid.viewport_rows.max(1) as isize;
                self.move_cursor(0, -rows, false);
            }
            KeyCode::PageDown => {
                let rows = self.grid.viewport_rows.max(1) as isize;
                self.move_cursor(0, rows, false);
            }
            KeyCode::Char('g') | KeyCode::Home => {
                let column = self.grid.cursor.column;
                self.dispatch(GridAction::SetCursor(CellCoord::new(column, 1)));
            }
            KeyCode::Char('G') | KeyCode::End => {
                let column = self.grid.cursor.column;
                let last = self.grid.total.max(1);
                self.dispatch(GridAction::SetCursor(CellCoord::new(column, last)));
            }
            KeyCode::Char('c') => {
                let column = self.grid.cursor.column;
                if column > 0 {
                    let selection = self.grid.selection.toggle_column(column);
                    self.set_selection(selection);
                }
            }
            KeyCode::Char('C') => {
                let column = self.grid.cursor.column;
                if column > 0 {
                    let selection = self.grid.selection.extend_column_range(column, column);
                    self.set_selection(selection);
                }
            }
            KeyCode::Char('r') => {
                let selection = self.grid.selection.toggle_row(self.grid.cursor.row);
                self.set_selection(selection);
            }
            KeyCode::Char('R') => {
                let row = self.grid.cursor.row;
                let selection = self.grid.selection.extend_row_range(row, row);
                self.set_selection(selection);
            }
            KeyCode::Char(' ') => {
                let row = self.grid.cursor.row;
                self.set_selection(build_range_state(Some(Region::SelectedRow(row))));
            }
            KeyCode::Char('y') | KeyCode::Enter => self.request_copy(),
            KeyCode::Esc => {
                if self.grid.error.is_some() {
                    self.dispatch(GridAction::DismissError);
                }
                if !self.grid.selection.is_empty() {
                    self.dispatch(GridAction::ClearSelection);
                }
            }
            KeyCode::Char('b') => {
                let next = BackgroundMode::cycle(self.grid.background_mode);
                self.dispatch(GridAction::SetBackgroundMode(next));
            }
            KeyCode::Char('B') => self.dispatch(GridAction::SetBackgroundMode(None)),
            KeyCode::Char('L') => self.column_action(MenuAction::ToggleLock),
            KeyCode::Char('H') => self.column_action(MenuAction::Hide),
            KeyCode::Char('U') => self.dispatch(GridAction::UnhideAll),
            KeyCode::Char('<') => self.column_action(MenuAction::MoveLeft),
            KeyCode::Char('>') => self.column_action(MenuAction::MoveRight),
            KeyCode::Char('=') => self.column_action(MenuAction::AutoSize),
            KeyCode::Char('+') => {
                if let Some(name) = self.cursor_column_name() {
                    self.dispatch(GridAction::ResizeColumn(name, 1));
                }
            }
            KeyCode::Char('-') => {
                if let Some(name) = self.cursor_column_name() {
                    self.dispatch(GridAction::ResizeColumn(name, -1));
                }
            }
            KeyCode::Char('s') => {
                if let Some(name) = self.cursor_column_name() {
                    self.dispatch(GridAction::CycleSort(name));
                }
            }
            KeyCode::Char('m') => {
                if let Some(column) = self.grid.cursor_column().cloned() {
                    self.column_menu.open(&column);
                }
            }
            KeyCode::Char('t') => self.show_traceback(),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
        None
    }

    fn mouse(&mut self, event: &MouseEvent) -> Option<AppEvent> {
        self.debug.num_mouse_events += 1;
        if self.error_modal.active
            || self.confirmation_modal.active
            || self.show_help
            || self.column_menu.active
        {
            return None;
        }
        let shift = event.modifiers.contains(KeyModifiers::SHIFT);
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);

        match event.kind {
            MouseEventKind::ScrollDown => self.dispatch(GridAction::ScrollBy(WHEEL_ROWS)),
            MouseEventKind::ScrollUp => self.dispatch(GridAction::ScrollBy(-WHEEL_ROWS)),
            MouseEventKind::Down(MouseButton::Left) => {
                let cell = self.grid_view.hit_test(event.column, event.row)?;
                self.click(cell, shift, ctrl);
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let anchor = self.drag_anchor?;
                let cell = self.grid_view.hit_test(event.column, event.row)?;
                if cell.is_header() {
                    return None;
                }
                let end = CellCoord::new(cell.column.max(1), cell.row);
                self.set_selection(build_range_state(Some(Region::RangeSelect(Span::new(
                    anchor, end,
                )))));
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.drag_anchor.take().is_some()
                    && self.grid.selection.phase() == selection::SelectionPhase::RangeComplete
                {
                    self.request_copy();
                }
            }
            _ => {}
        }
        None
    }

    fn click(&mut self, cell: CellCoord, shift: bool, ctrl: bool) {
        let current = &self.grid.selection;
        if cell.is_header() {
            if cell.is_index_column() {
                return;
            }
            let selection = if ctrl {
                current.toggle_column(cell.column)
            } else if shift {
                current.extend_column_range(cell.column, cell.column)
            } else {
                build_range_state(Some(Region::ColumnRange(Span::single(cell.column))))
            };
            self.set_selection(selection);
            return;
        }
        if cell.is_index_column() {
            let selection = if ctrl {
                current.toggle_row(cell.row)
            } else if shift {
                current.extend_row_range(cell.row, cell.row)
            } else {
                build_range_state(Some(Region::RowRange(Span::single(cell.row))))
            };
            self.set_selection(selection);
            return;
        }

        let anchor = self.grid.cursor;
        if shift {
            let selection = current.extend_range(anchor, cell);
            self.set_selection(selection);
            self.request_copy();
        } else {
            self.drag_anchor = Some(cell);
            self.set_selection(SelectionState::anchor(cell));
        }
        self.dispatch(GridAction::SetCursor(cell));
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Mouse(mouse) => self.mouse(mouse),
            AppEvent::Resize(_, _) => None,
            AppEvent::Viewport { rows, width } => {
                self.dispatch(GridAction::SetViewport {
                    rows: *rows,
                    width: *width,
                });
                None
            }
            AppEvent::ColumnsLoaded(columns) => {
                self.dispatch(GridAction::SetColumns(columns.clone()));
                None
            }
            AppEvent::RowsLoaded {
                generation,
                response,
            } => {
                self.dispatch(GridAction::DataReceived {
                    generation: *generation,
                    response: response.clone(),
                });
                if self.grid.total > 0 {
                    if let Some(cell) = self.initial_cell.take() {
                        self.dispatch(GridAction::SetCursor(cell));
                    }
                }
                None
            }
            AppEvent::RowsFailed {
                generation,
                failure,
            } => {
                self.dispatch(GridAction::FetchFailed {
                    generation: *generation,
                    error: failure.error.clone(),
                    traceback: failure.traceback.clone(),
                });
                None
            }
            AppEvent::BackendError(failure) => {
                self.dispatch(GridAction::ShowError {
                    error: failure.error.clone(),
                    traceback: failure.traceback.clone(),
                });
                None
            }
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn status_text(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(status) = &self.status {
            parts.push(status.clone());
        }
        if let Some(mode) = self.grid.background_mode {
            parts.push(mode.label().to_string());
        }
        if let Some(summary) = selection_summary(&self.grid.selection) {
            parts.push(summary);
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" | "))
        }
    }

    fn controls(&mut self) -> Controls {
        let controls = Controls::from_context(self.grid.total, &self.ctx)
            .with_status(self.status_text());
        let controls = if self.confirmation_modal.active {
            controls.with_custom_controls(vec![("y", "Yes"), ("n", "No"), ("h", "Headers")])
        } else if self.column_menu.active {
            controls.with_custom_controls(vec![
                ("↑↓", "Select"),
                ("Enter", "Apply"),
                ("Esc", "Close"),
            ])
        } else if self.error_modal.active {
            controls.with_custom_controls(vec![("↑↓", "Scroll"), ("Esc", "Close")])
        } else {
            controls
        };
        if self.is_busy() {
            self.throbber_frame = self.throbber_frame.wrapping_add(1);
        }
        controls
            .with_busy(self.is_busy(), self.throbber_frame)
            .with_unicode_throbber(self.unicode_throbber)
    }

    /// Queue a viewport update when the grid body changed size.
    fn report_viewport(&mut self) {
        let viewport = self.grid_view.viewport;
        if self.reported_viewport == Some(viewport) {
            return;
        }
        self.reported_viewport = Some(viewport);
        let (rows, width) = viewport;
        if self.events.send(AppEvent::Viewport { rows, width }).is_err() {
            log::debug!("Event channel closed, viewport update dropped");
        }
    }
}

fn locale_is_utf8() -> bool {
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
        .is_some_and(|value| {
            let value = value.to_ascii_lowercase();
            value.contains("utf-8") || value.contains("utf8")
        })
}

fn selection_summary(selection: &SelectionState) -> Option<String> {
    if let Some(row) = selection.selected_row {
        return Some(format!("Row {}", row));
    }
    if let Some(span) = selection.column_range {
        let (lo, hi) = coord::ordered(span.start, span.end);
        return Some(format!("Columns {}-{}", lo, hi));
    }
    if let Some(span) = selection.row_range {
        let (lo, hi) = coord::ordered(span.start, span.end);
        return Some(format!("Rows {}-{}", lo, hi));
    }
    if let Some(rows) = &selection.ctrl_rows {
        return Some(format!("{} rows", rows.len()));
    }
    if let Some(cols) = &selection.ctrl_cols {
        return Some(format!("{} columns", cols.len()));
    }
    selection
        .range_select
        .map(|span| format!("{} to {}", span.start, span.end))
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        Block::default()
            .style(Style::default().bg(self.ctx.background))
            .render(area, buf);

        let layout = app_layout(area, self.debug.enabled);

        let grid = DataGrid::new(&self.grid, &self.colors).with_context(&self.ctx);
        StatefulWidget::render(grid, layout.grid, buf, &mut self.grid_view);
        self.report_viewport();

        if self.column_menu.active {
            render_column_menu(layout.grid, buf, &mut self.column_menu, &self.grid, &self.ctx);
        }
        if self.confirmation_modal.active {
            render::overlays::render_confirmation_modal(
                layout.grid,
                buf,
                &self.confirmation_modal,
                &self.ctx,
            );
        }
        if self.error_modal.active {
            render::overlays::render_error_modal(
                layout.grid,
                buf,
                &mut self.error_modal,
                &self.ctx,
            );
        }
        if self.show_help {
            let (title, text) = if self.column_menu.active {
                ("Column Menu Help", help_strings::column_menu())
            } else {
                ("Help", help_strings::grid())
            };
            render::overlays::render_help_overlay(
                layout.grid,
                buf,
                title,
                text,
                &mut self.help_scroll,
                &self.ctx,
            );
        }

        let controls = self.controls();
        controls.render(layout.control_bar, buf);
        if let Some(debug_area) = layout.debug {
            self.debug.render(debug_area, buf);
        }
    }
}

/// Connect to the configured server and run the TUI until the user quits.
pub fn run(config: AppConfig, initial_cell: Option<CellCoord>) -> Result<()> {
    use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
    use crossterm::execute;
    use std::sync::{mpsc, Mutex, Once};
    use std::time::Duration;

    let theme = Theme::from_config(&config.theme)
        .or_else(|e| Theme::from_config(&AppConfig::default().theme).map_err(|_| e))?;

    static COLOR_EYRE_INIT: Once = Once::new();
    static INSTALL_RESULT: Mutex<Option<Result<(), color_eyre::Report>>> = Mutex::new(None);
    COLOR_EYRE_INIT.call_once(|| {
        *INSTALL_RESULT.lock().unwrap_or_else(|e| e.into_inner()) = Some(color_eyre::install());
    });
    if let Some(Err(e)) = INSTALL_RESULT
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .as_ref()
    {
        return Err(color_eyre::eyre::eyre!(e.to_string()));
    }

    log::info!(
        "Connecting to {} (data id {})",
        config.server.url,
        config.server.data_id
    );
    let source: Arc<dyn DataSource> = Arc::new(DtaleClient::new(
        &config.server.url,
        &config.server.data_id,
        Duration::from_secs(config.server.timeout_secs),
    ));

    let (tx, rx) = mpsc::channel::<AppEvent>();
    let loader = Loader::spawn(source, tx.clone())?;
    let poll_interval = Duration::from_millis(config.performance.event_poll_interval_ms);
    let mut app = App::new_with_config(tx.clone(), theme, config).with_loader(loader);

    let mut terminal = ratatui::try_init().map_err(|e| {
        color_eyre::eyre::eyre!(
            "dtgrid requires an interactive terminal (TTY). No terminal detected: {}. \
             Run from a terminal or ensure stdout is connected to a TTY.",
            e
        )
    })?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    app.start(initial_cell);
    terminal.draw(|frame| frame.render_widget(&mut app, frame.area()))?;

    let result = (|| -> Result<()> {
        loop {
            if crossterm::event::poll(poll_interval)? {
                match crossterm::event::read()? {
                    crossterm::event::Event::Key(key) => {
                        if key.is_press() {
                            tx.send(AppEvent::Key(key))?
                        }
                    }
                    crossterm::event::Event::Mouse(mouse) => tx.send(AppEvent::Mouse(mouse))?,
                    crossterm::event::Event::Resize(cols, rows) => {
                        tx.send(AppEvent::Resize(cols, rows))?
                    }
                    _ => {}
                }
            }

            let updated = match rx.recv_timeout(Duration::from_millis(0)) {
                Ok(event) => {
                    match event {
                        AppEvent::Exit => break,
                        AppEvent::Crash(msg) => {
                            return Err(color_eyre::eyre::eyre!(msg));
                        }
                        event => {
                            if let Some(next) = app.event(&event) {
                                tx.send(next)?;
                            }
                        }
                    }
                    true
                }
                Err(mpsc::RecvTimeoutError::Timeout) => false,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            };

            if updated || app.is_busy() {
                terminal.draw(|frame| frame.render_widget(&mut app, frame.area()))?;
            }
        }
        Ok(())
    })();

    if let Err(e) = execute!(std::io::stdout(), DisableMouseCapture) {
        log::warn!("Failed to disable mouse capture: {}", e);
    }
    ratatui::restore();
    result
}

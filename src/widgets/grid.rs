//! Virtualized grid.
//!
//! Layout left to right: locked columns (index column first), a one-cell
//! separator, then scrolling columns starting at the store's `left_column`.
//! Only rows inside the viewport are turned into table rows. The last render's
//! geometry is kept in [`GridViewState`] so mouse events can be mapped back to
//! cell coordinates.

use std::ops::Range;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Flex, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Cell, Clear, Padding, Paragraph, Row, StatefulWidget, Table,
        Widget, Wrap,
    },
};

use crate::column::{sort_for, Column};
use crate::config::ColorParser;
use crate::coord::CellCoord;
use crate::page::{CellValue, RowRecord};
use crate::render::context::RenderContext;
use crate::selection::is_in_range;
use crate::store::GridState;

/// Placeholder for cells in rows that are not loaded yet.
const PENDING: &str = "...";

/// Screen position of one rendered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSlot {
    /// Position in the active column list.
    pub column: usize,
    pub x: u16,
    pub width: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridViewState {
    pub area: Rect,
    pub slots: Vec<ColumnSlot>,
    pub top_row: usize,
    pub total: usize,
    pub padding: u16,
    /// (data rows, usable width) measured by the last render.
    pub viewport: (usize, u16),
    pub layout_epoch: u64,
    /// The body shows an error alert instead of rows; only headers hit-test.
    pub body_hidden: bool,
}

impl GridViewState {
    /// Cell under screen position (`x`, `y`). Row 0 is the header.
    pub fn hit_test(&self, x: u16, y: u16) -> Option<CellCoord> {
        let area = self.area;
        if x < area.x || x >= area.right() || y < area.y || y >= area.bottom() {
            return None;
        }
        let slot = self
            .slots
            .iter()
            .find(|s| x >= s.x && x < s.x.saturating_add(s.width).saturating_add(self.padding))?;
        let offset = (y - area.y) as usize;
        if offset == 0 {
            return Some(CellCoord::new(slot.column, 0));
        }
        if self.body_hidden {
            return None;
        }
        let row = self.top_row + offset;
        if row > self.total {
            return None;
        }
        Some(CellCoord::new(slot.column, row))
    }

    /// Screen column slots, left to right.
    pub fn visible_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().map(|s| s.column)
    }
}

pub struct DataGrid<'a> {
    grid: &'a GridState,
    colors: &'a ColorParser,
    pub header_bg: Color,
    pub header_fg: Color,
    pub row_numbers_fg: Color,
    pub separator_fg: Color,
    pub cursor_bg: Color,
    pub selection_bg: Color,
    pub error_fg: Color,
    pub dimmed_fg: Color,
    pub table_cell_padding: u16,
    pub alternate_row_bg: Option<Color>,
}

impl<'a> DataGrid<'a> {
    pub fn new(grid: &'a GridState, colors: &'a ColorParser) -> Self {
        Self {
            grid,
            colors,
            header_bg: Color::Indexed(236),
            header_fg: Color::White,
            row_numbers_fg: Color::DarkGray,
            separator_fg: Color::White,
            cursor_bg: Color::Indexed(238),
            selection_bg: Color::Indexed(24),
            error_fg: Color::Red,
            dimmed_fg: Color::DarkGray,
            table_cell_padding: grid.options.cell_padding,
            alternate_row_bg: None,
        }
    }

    pub fn with_context(mut self, ctx: &RenderContext) -> Self {
        self.header_bg = ctx.table_header_bg;
        self.header_fg = ctx.table_header;
        self.row_numbers_fg = ctx.row_numbers;
        self.separator_fg = ctx.column_separator;
        self.cursor_bg = ctx.cursor;
        self.selection_bg = ctx.selection;
        self.error_fg = ctx.error;
        self.dimmed_fg = ctx.dimmed;
        self.alternate_row_bg = ctx.alternate_row_color;
        self
    }

    fn header_style(&self) -> Style {
        if self.header_bg == Color::Reset {
            Style::default().fg(self.header_fg)
        } else {
            Style::default().bg(self.header_bg).fg(self.header_fg)
        }
    }

    fn header_cell(&self, column: &Column, position: usize) -> Cell<'static> {
        let label = match sort_for(&column.name, &self.grid.sort_info) {
            Some(direction) => format!("{} {}", column.name, direction.marker()),
            None => column.name.clone(),
        };
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if is_in_range(position, 0, &self.grid.selection) {
            style = style.bg(self.selection_bg);
        } else if position == self.grid.cursor.column {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        Cell::from(Span::styled(label, style))
    }

    fn body_cell(
        &self,
        column: &Column,
        position: usize,
        data_row: usize,
        record: Option<&RowRecord>,
    ) -> Cell<'static> {
        let grid_row = data_row + 1;
        let value: Option<&CellValue> = record.and_then(|r| r.get(&column.name));
        let text = match (record, value) {
            (None, _) if column.is_index() => data_row.to_string(),
            (None, _) => PENDING.to_string(),
            (Some(_), Some(cell)) => cell.view.clone(),
            (Some(_), None) => String::new(),
        };

        let mut style = if record.is_none() {
            Style::default().fg(self.dimmed_fg)
        } else if column.is_index() {
            Style::default().fg(self.row_numbers_fg)
        } else {
            Style::default()
        };
        if self.grid.cursor == CellCoord::new(position, grid_row) {
            style = style.bg(self.cursor_bg).add_modifier(Modifier::BOLD);
        } else if is_in_range(position, grid_row, &self.grid.selection) {
            style = style.bg(self.selection_bg);
        } else if let Some(rgb) = value.and_then(|c| c.style.background) {
            style = style.bg(self.colors.rgb(rgb)).fg(Color::Black);
        }

        let line = Line::from(Span::styled(text, style));
        let line = if column.is_index() || column.column_type().is_numeric() {
            line.right_aligned()
        } else {
            line
        };
        Cell::from(line)
    }

    fn render_columns(
        &self,
        active: &[&Column],
        slots: &[ColumnSlot],
        area: Rect,
        buf: &mut Buffer,
    ) {
        if slots.is_empty() || area.width == 0 || area.height == 0 {
            return;
        }
        let widths: Vec<Constraint> = slots.iter().map(|s| Constraint::Length(s.width)).collect();
        let header: Vec<Cell> = slots
            .iter()
            .map(|s| self.header_cell(active[s.column], s.column))
            .collect();

        let body_rows = (area.height.saturating_sub(1) as usize)
            .min(self.grid.total.saturating_sub(self.grid.top_row));
        let rows: Vec<Row> = (0..body_rows)
            .map(|offset| {
                let data_row = self.grid.top_row + offset;
                let record = self.grid.data.row(data_row);
                let cells: Vec<Cell> = slots
                    .iter()
                    .map(|s| self.body_cell(active[s.column], s.column, data_row, record))
                    .collect();
                let row_style = if data_row % 2 == 1 {
                    self.alternate_row_bg
                        .map(|c| Style::default().bg(c))
                        .unwrap_or_default()
                } else {
                    Style::default()
                };
                Row::new(cells).style(row_style)
            })
            .collect();

        Widget::render(
            Table::new(rows, widths)
                .column_spacing(self.table_cell_padding)
                .flex(Flex::Start)
                .header(Row::new(header).style(self.header_style())),
            area,
            buf,
        );
    }

    /// Dismissible alert in place of the grid body. Cached rows are kept and
    /// come back once the error is dismissed.
    fn render_error(&self, error: &str, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let hint = if self.grid.traceback.is_some() {
            "t: traceback  Esc: dismiss"
        } else {
            "Esc: dismiss"
        };
        Clear.render(area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.error_fg))
            .title("Error")
            .title_bottom(Line::from(Span::styled(
                format!(" {} ", hint),
                Style::default().fg(self.dimmed_fg),
            )));
        Paragraph::new(error)
            .style(Style::default().fg(self.error_fg))
            .wrap(Wrap { trim: true })
            .block(block)
            .render(area, buf);
    }
}

/// Lay out columns `range` from the left edge of `area`; the last one is cut
/// to the remaining width.
fn layout_slots(
    active: &[&Column],
    range: Range<usize>,
    area: Rect,
    padding: u16,
) -> Vec<ColumnSlot> {
    let mut slots = Vec::new();
    let mut x = area.x;
    let end = area.right();
    for column in range {
        if x >= end {
            break;
        }
        let width = active[column].width.min(end - x);
        slots.push(ColumnSlot { column, x, width });
        x = x.saturating_add(width).saturating_add(padding);
    }
    slots
}

impl StatefulWidget for DataGrid<'_> {
    type State = GridViewState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let grid = self.grid;
        let active = grid.active_columns();
        let locked = grid.locked_count().min(active.len());
        let padding = self.table_cell_padding;

        let locked_width = active[..locked]
            .iter()
            .fold(0u16, |acc, c| acc.saturating_add(c.width).saturating_add(padding));
        let separator = u16::from(locked > 0 && locked_width < area.width);

        state.area = area;
        state.top_row = grid.top_row;
        state.total = grid.total;
        state.padding = padding;
        state.layout_epoch = grid.layout_epoch;
        state.body_hidden = false;
        state.viewport = (
            area.height.saturating_sub(1) as usize,
            area.width.saturating_sub(separator),
        );
        state.slots.clear();

        if active.is_empty() {
            let (text, style) = match &grid.error {
                Some(error) => (format!("Error: {}", error), Style::default().fg(self.error_fg)),
                None => ("Loading...".to_string(), Style::default().fg(self.dimmed_fg)),
            };
            Paragraph::new(text)
                .style(style)
                .centered()
                .block(Block::default().padding(Padding::top(area.height / 2)))
                .wrap(Wrap { trim: true })
                .render(area, buf);
            return;
        }

        // An error replaces the body; only the header row stays.
        let table_area = if grid.error.is_some() {
            Rect {
                height: area.height.min(1),
                ..area
            }
        } else {
            area
        };
        let locked_area = Rect {
            width: locked_width.min(area.width),
            ..table_area
        };
        let locked_slots = layout_slots(&active, 0..locked, locked_area, padding);

        let scroll_x = locked_area.right().saturating_add(separator);
        let scroll_area = Rect {
            x: scroll_x,
            width: area.right().saturating_sub(scroll_x),
            ..table_area
        };
        let left = grid.left_column.max(locked);
        let scroll_slots = layout_slots(&active, left..active.len(), scroll_area, padding);

        self.render_columns(&active, &locked_slots, locked_area, buf);
        if separator == 1 {
            let x = locked_area.right();
            for y in table_area.y..table_area.bottom() {
                let cell = &mut buf[(x, y)];
                cell.set_char('│');
                cell.set_style(Style::default().fg(self.separator_fg));
            }
        }
        self.render_columns(&active, &scroll_slots, scroll_area, buf);

        state.slots = locked_slots;
        state.slots.extend(scroll_slots);

        if let Some(error) = &grid.error {
            state.body_hidden = true;
            let body = Rect {
                y: table_area.bottom(),
                height: area.height.saturating_sub(table_area.height),
                ..area
            };
            self.render_error(error, body, buf);
        }
    }
}

//! Per-column action menu (`m`).

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, StatefulWidget, Widget},
};

use crate::background::BackgroundMode;
use crate::client::MoveAction;
use crate::column::{sort_for, Column, SortDirection};
use crate::render::context::RenderContext;
use crate::render::layout::centered_rect_fixed;
use crate::store::{GridAction, GridState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    SortAscending,
    SortDescending,
    ClearSort,
    ToggleLock,
    Hide,
    MoveLeft,
    MoveRight,
    MoveFront,
    MoveBack,
    HeatMap,
    AutoSize,
}

impl MenuAction {
    pub const ALL: [MenuAction; 11] = [
        Self::SortAscending,
        Self::SortDescending,
        Self::ClearSort,
        Self::ToggleLock,
        Self::Hide,
        Self::MoveLeft,
        Self::MoveRight,
        Self::MoveFront,
        Self::MoveBack,
        Self::HeatMap,
        Self::AutoSize,
    ];

    /// Actions that reorder or hide a column; not offered for the index column.
    fn edits_layout(&self) -> bool {
        matches!(
            self,
            Self::ToggleLock
                | Self::Hide
                | Self::MoveLeft
                | Self::MoveRight
                | Self::MoveFront
                | Self::MoveBack
        )
    }

    pub fn label(&self, column: &Column, grid: &GridState) -> String {
        let current = sort_for(&column.name, &grid.sort_info);
        let mark = |direction: SortDirection| {
            if current == Some(&direction) {
                " (current)"
            } else {
                ""
            }
        };
        match self {
            Self::SortAscending => format!("Sort ascending{}", mark(SortDirection::Ascending)),
            Self::SortDescending => format!("Sort descending{}", mark(SortDirection::Descending)),
            Self::ClearSort => "Clear sort".to_string(),
            Self::ToggleLock if column.locked => "Unlock".to_string(),
            Self::ToggleLock => "Lock".to_string(),
            Self::Hide => "Hide".to_string(),
            Self::MoveLeft => "Move left".to_string(),
            Self::MoveRight => "Move right".to_string(),
            Self::MoveFront => "Move to front".to_string(),
            Self::MoveBack => "Move to back".to_string(),
            Self::HeatMap if grid.background_mode == Some(BackgroundMode::HeatmapCol) => {
                "Heat map off".to_string()
            }
            Self::HeatMap => "Heat map".to_string(),
            Self::AutoSize => "Auto-size width".to_string(),
        }
    }
}

/// Store actions for `action` on `column`.
pub fn menu_actions(action: MenuAction, column: &Column, grid: &GridState) -> Vec<GridAction> {
    let name = column.name.clone();
    match action {
        MenuAction::SortAscending => {
            vec![GridAction::SetSort(vec![(name, SortDirection::Ascending)])]
        }
        MenuAction::SortDescending => {
            vec![GridAction::SetSort(vec![(name, SortDirection::Descending)])]
        }
        MenuAction::ClearSort => {
            if sort_for(&name, &grid.sort_info).is_none() {
                return Vec::new();
            }
            let remaining = grid
                .sort_info
                .iter()
                .filter(|(col, _)| *col != name)
                .cloned()
                .collect();
            vec![GridAction::SetSort(remaining)]
        }
        MenuAction::ToggleLock if column.locked => vec![GridAction::Unlock(name)],
        MenuAction::ToggleLock => vec![GridAction::Lock(name)],
        MenuAction::Hide => vec![GridAction::ToggleColumnVisibility(name)],
        MenuAction::MoveLeft => vec![GridAction::MoveColumn(name, MoveAction::Left)],
        MenuAction::MoveRight => vec![GridAction::MoveColumn(name, MoveAction::Right)],
        MenuAction::MoveFront => vec![GridAction::MoveColumn(name, MoveAction::Front)],
        MenuAction::MoveBack => vec![GridAction::MoveColumn(name, MoveAction::Back)],
        MenuAction::HeatMap => {
            let mode = if grid.background_mode == Some(BackgroundMode::HeatmapCol) {
                None
            } else {
                Some(BackgroundMode::HeatmapCol)
            };
            vec![GridAction::SetBackgroundMode(mode)]
        }
        MenuAction::AutoSize => vec![GridAction::AutoSize(Some(name))],
    }
}

#[derive(Debug, Default)]
pub struct ColumnMenu {
    pub active: bool,
    pub column: String,
    pub entries: Vec<MenuAction>,
    pub list_state: ListState,
}

impl ColumnMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, column: &Column) {
        self.active = true;
        self.column = column.name.clone();
        self.entries = MenuAction::ALL
            .iter()
            .copied()
            .filter(|a| !(column.is_index() && a.edits_layout()))
            .collect();
        self.list_state.select(Some(0));
    }

    pub fn close(&mut self) {
        self.active = false;
        self.column.clear();
        self.entries.clear();
        self.list_state.select(None);
    }

    pub fn select_next(&mut self) {
        let n = self.entries.len();
        if n == 0 {
            return;
        }
        let i = self.list_state.selected().map_or(0, |i| (i + 1) % n);
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        let n = self.entries.len();
        if n == 0 {
            return;
        }
        let i = self
            .list_state
            .selected()
            .map_or(0, |i| if i == 0 { n - 1 } else { i - 1 });
        self.list_state.select(Some(i));
    }

    pub fn selected(&self) -> Option<MenuAction> {
        self.list_state
            .selected()
            .and_then(|i| self.entries.get(i))
            .copied()
    }
}

pub fn render_column_menu(
    area: Rect,
    buf: &mut Buffer,
    menu: &mut ColumnMenu,
    grid: &GridState,
    ctx: &RenderContext,
) {
    let Some(column) = grid.columns.iter().find(|c| c.name == menu.column) else {
        return;
    };
    let items: Vec<ListItem> = menu
        .entries
        .iter()
        .map(|a| ListItem::new(a.label(column, grid)))
        .collect();
    let height = menu.entries.len() as u16 + 2;
    let width = (column.name.chars().count() as u16 + 4).clamp(30, 60);
    let popup = centered_rect_fixed(area, width, height);
    Clear.render(popup, buf);

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(column.name.as_str())
                .border_style(ctx.border_style(false))
                .style(ctx.surface_style()),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    StatefulWidget::render(list, popup, buf, &mut menu.list_state);
}

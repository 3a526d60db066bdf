use crate::config::Theme;
use ratatui::style::{Color, Style};

/// Resolved theme colors, built once per theme and shared by every widget.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub background: Color,
    pub surface: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub dimmed: Color,
    pub error: Color,

    // control bar
    pub controls_bg: Color,
    pub keybind_hints: Color,
    pub keybind_labels: Color,
    pub throbber: Color,

    // modals
    pub modal_border_active: Color,
    pub modal_border_error: Color,

    // grid
    pub table_header: Color,
    pub table_header_bg: Color,
    pub row_numbers: Color,
    pub column_separator: Color,
    pub cursor: Color,
    pub selection: Color,
    pub alternate_row_color: Option<Color>,
}

impl RenderContext {
    pub fn from_theme(theme: &Theme) -> Self {
        let color = |name: &str| theme.get(name);
        Self {
            background: color("background"),
            surface: color("surface"),
            text_primary: color("text_primary"),
            text_secondary: color("text_secondary"),
            dimmed: color("dimmed"),
            error: color("error"),
            controls_bg: color("controls_bg"),
            keybind_hints: color("keybind_hints"),
            keybind_labels: color("keybind_labels"),
            throbber: color("throbber"),
            modal_border_active: color("modal_border_active"),
            modal_border_error: color("modal_border_error"),
            table_header: color("table_header"),
            table_header_bg: color("table_header_bg"),
            row_numbers: color("row_numbers"),
            column_separator: color("column_separator"),
            cursor: color("cursor"),
            selection: color("selection"),
            alternate_row_color: theme.get_optional("alternate_row_color"),
        }
    }

    /// Popup body: primary text on the surface color.
    pub fn surface_style(&self) -> Style {
        Style::default().fg(self.text_primary).bg(self.surface)
    }

    /// Popup border, red when the popup reports an error.
    pub fn border_style(&self, error: bool) -> Style {
        let fg = if error {
            self.modal_border_error
        } else {
            self.modal_border_active
        };
        Style::default().fg(fg)
    }
}

use crate::render::context::RenderContext;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Paragraph, Widget},
};

const DEFAULT_CONTROLS: [(&str, &str); 9] = [
    ("m", "Menu"),
    ("b", "Background"),
    ("s", "Sort"),
    ("y", "Copy"),
    ("L", "Lock"),
    ("H", "Hide"),
    ("^r", "Refresh"),
    ("?", "Help"),
    ("q", "Quit"),
];

/// Key hints on the left, row count and status on the right, then a
/// throbber slot that animates while a fetch is in flight.
pub struct Controls {
    pub row_count: Option<usize>,
    /// Short status (background mode, selection size) shown before the row count.
    pub status: Option<String>,
    pub custom_controls: Option<Vec<(&'static str, &'static str)>>,
    pub bg_color: Color,
    pub key_color: Color,
    pub label_color: Color,
    pub throbber_color: Color,
    pub use_unicode_throbber: bool,
    pub busy: bool,
    pub throbber_frame: u8,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            row_count: None,
            status: None,
            custom_controls: None,
            bg_color: Color::Indexed(236),
            key_color: Color::Cyan,
            label_color: Color::White,
            throbber_color: Color::Cyan,
            use_unicode_throbber: false,
            busy: false,
            throbber_frame: 0,
        }
    }
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_context(row_count: usize, ctx: &RenderContext) -> Self {
        Self {
            row_count: Some(row_count),
            bg_color: ctx.controls_bg,
            key_color: ctx.keybind_hints,
            label_color: ctx.keybind_labels,
            throbber_color: ctx.throbber,
            ..Self::default()
        }
    }

    pub fn with_busy(mut self, busy: bool, throbber_frame: u8) -> Self {
        self.busy = busy;
        self.throbber_frame = throbber_frame;
        self
    }

    pub fn with_status(mut self, status: Option<String>) -> Self {
        self.status = status;
        self
    }

    pub fn with_custom_controls(mut self, controls: Vec<(&'static str, &'static str)>) -> Self {
        self.custom_controls = Some(controls);
        self
    }

    pub fn with_unicode_throbber(mut self, use_unicode: bool) -> Self {
        self.use_unicode_throbber = use_unicode;
        self
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let no_bg = self.bg_color == Color::Reset;
        if !no_bg {
            Block::default()
                .style(Style::default().bg(self.bg_color))
                .render(area, buf);
        }

        let controls: Vec<(&str, &str)> = match &self.custom_controls {
            Some(custom) => custom.to_vec(),
            None => DEFAULT_CONTROLS.to_vec(),
        };

        // Key: key + 1 space. Label: action + 1 space before the next key.
        let pair_width = |(key, action): &(&str, &str)| -> u16 {
            (key.chars().count() as u16 + 1) + (action.chars().count() as u16 + 1)
        };

        const THROBBER_WIDTH: u16 = 3;
        let status_width = self
            .status
            .as_ref()
            .map(|s| s.chars().count() as u16 + 2)
            .unwrap_or(0);
        let right_reserved = (if self.row_count.is_some() { 21 } else { 1 })
            + status_width
            + THROBBER_WIDTH;
        let mut available = area.width.saturating_sub(right_reserved);

        let mut n_show = 0;
        for pair in controls.iter() {
            let need = pair_width(pair);
            if available < need {
                break;
            }
            available -= need;
            n_show += 1;
        }

        let mut constraints: Vec<Constraint> = controls
            .iter()
            .take(n_show)
            .flat_map(|(key, action)| {
                [
                    Constraint::Length(key.chars().count() as u16 + 1),
                    Constraint::Length(action.chars().count() as u16 + 1),
                ]
            })
            .collect();

        constraints.push(Constraint::Fill(1));
        if self.status.is_some() {
            constraints.push(Constraint::Length(status_width));
        }
        if self.row_count.is_some() {
            constraints.push(Constraint::Length(20));
        }
        constraints.push(Constraint::Length(THROBBER_WIDTH));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);

        let (key_style, label_style, fill_style) = if no_bg {
            (
                Style::default().fg(self.key_color),
                Style::default().fg(self.label_color),
                Style::default(),
            )
        } else {
            let base = Style::default().bg(self.bg_color);
            (base.fg(self.key_color), base.fg(self.label_color), base)
        };

        for (i, (key, action)) in controls.iter().take(n_show).enumerate() {
            let j = i * 2;
            Paragraph::new(*key).style(key_style).render(layout[j], buf);
            Paragraph::new(*action)
                .style(label_style)
                .render(layout[j + 1], buf);
        }

        let mut idx = n_show * 2;
        Paragraph::new("").style(fill_style).render(layout[idx], buf);
        idx += 1;

        if let Some(status) = &self.status {
            Paragraph::new(status.as_str())
                .style(key_style)
                .right_aligned()
                .render(layout[idx], buf);
            idx += 1;
        }

        if let Some(count) = self.row_count {
            Paragraph::new(format!("Rows: {}", format_number_with_commas(count)))
                .style(label_style)
                .right_aligned()
                .render(layout[idx], buf);
            idx += 1;
        }

        // ASCII |/-\ or the 8-frame braille spinner when the locale is UTF-8.
        const THROBBER_ASCII: [char; 4] = ['|', '/', '-', '\\'];
        const THROBBER_BRAILLE_EIGHT: [char; 8] = ['⣷', '⣯', '⣟', '⡿', '⢿', '⣻', '⣽', '⣾'];
        let throbber_ch = if !self.busy {
            ' '
        } else if self.use_unicode_throbber {
            THROBBER_BRAILLE_EIGHT[self.throbber_frame as usize % 8]
        } else {
            THROBBER_ASCII[self.throbber_frame as usize % 4]
        };
        let throbber_style = if no_bg {
            Style::default().fg(self.throbber_color)
        } else {
            Style::default().bg(self.bg_color).fg(self.throbber_color)
        };
        Paragraph::new(throbber_ch.to_string())
            .style(throbber_style)
            .centered()
            .render(layout[idx], buf);
    }
}

pub fn format_number_with_commas(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

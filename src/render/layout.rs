use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Top-level layout: grid, control bar, optional debug row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub grid: Rect,
    pub control_bar: Rect,
    pub debug: Option<Rect>,
}

pub fn app_layout(area: Rect, debug_enabled: bool) -> AppLayout {
    let mut constraints = vec![Constraint::Fill(1), Constraint::Length(1)];
    if debug_enabled {
        constraints.push(Constraint::Length(1));
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    AppLayout {
        grid: layout[0],
        control_bar: layout[1],
        debug: debug_enabled.then(|| layout[2]),
    }
}

/// Centered rect within `r` with given percentage width and height.
pub fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Centered rect with fixed width and height, clamped to fit inside `r`.
pub fn centered_rect_fixed(r: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(r.width);
    let h = height.min(r.height);
    Rect {
        x: r.x + r.width.saturating_sub(w) / 2,
        y: r.y + r.height.saturating_sub(h) / 2,
        width: w,
        height: h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_layout_minimal() {
        let layout = app_layout(Rect::new(0, 0, 100, 50), false);
        assert_eq!(layout.grid.height, 49);
        assert_eq!(layout.control_bar.y, 49);
        assert_eq!(layout.debug, None);
    }

    #[test]
    fn test_app_layout_with_debug() {
        let layout = app_layout(Rect::new(0, 0, 100, 50), true);
        assert_eq!(layout.grid.height, 48);
        assert_eq!(layout.control_bar.y, 48);
        assert_eq!(layout.debug, Some(Rect::new(0, 49, 100, 1)));
    }

    #[test]
    fn test_centered_rect_50_50() {
        let centered = centered_rect(Rect::new(0, 0, 100, 100), 50, 50);
        assert_eq!(centered, Rect::new(25, 25, 50, 50));
    }

    #[test]
    fn test_centered_rect_fixed_clamps() {
        let area = Rect::new(10, 10, 20, 8);
        assert_eq!(centered_rect_fixed(area, 10, 4), Rect::new(15, 12, 10, 4));
        assert_eq!(centered_rect_fixed(area, 50, 50), area);
    }
}

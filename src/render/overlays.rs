//! Overlay rendering (confirmation and error modals, help).

use crate::render::context::RenderContext;
use crate::render::layout::centered_rect;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::Widget;
use ratatui::style::Style;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};

fn button(label: &str, style: Style) -> Paragraph<'_> {
    Paragraph::new(label).centered().block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(style),
    )
}

/// Renders the confirmation modal (Yes/No).
pub fn render_confirmation_modal(
    area: Rect,
    buf: &mut Buffer,
    modal: &crate::ConfirmationModal,
    ctx: &RenderContext,
) {
    let popup_area = centered_rect(area, 64, 50);
    Clear.render(popup_area, buf);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(modal.title.as_str())
        .border_style(ctx.border_style(false))
        .style(ctx.surface_style());
    let inner_area = block.inner(popup_area);
    block.render(popup_area, buf);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(inner_area);

    Paragraph::new(modal.message.as_str())
        .style(ctx.surface_style())
        .wrap(Wrap { trim: false })
        .render(chunks[0], buf);

    let button_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(12),
            Constraint::Length(2),
            Constraint::Length(12),
            Constraint::Fill(1),
        ])
        .split(chunks[1]);

    let focused = Style::default().fg(ctx.modal_border_active);
    let (yes_style, no_style) = if modal.focus_yes {
        (focused, Style::default())
    } else {
        (Style::default(), focused)
    };
    button("Yes", yes_style).render(button_chunks[1], buf);
    button("No", no_style).render(button_chunks[3], buf);
}

/// Renders the error modal. The detail (server traceback) scrolls; `scroll`
/// is clamped so the caller can persist it.
pub fn render_error_modal(
    area: Rect,
    buf: &mut Buffer,
    modal: &mut crate::ErrorModal,
    ctx: &RenderContext,
) {
    let popup_area = centered_rect(area, 80, 70);
    Clear.render(popup_area, buf);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("Error")
        .border_style(ctx.border_style(true))
        .style(ctx.surface_style());
    let inner_area = block.inner(popup_area);
    block.render(popup_area, buf);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(inner_area);

    Paragraph::new(modal.message.as_str())
        .style(Style::default().fg(ctx.error))
        .wrap(Wrap { trim: true })
        .render(chunks[0], buf);

    if let Some(detail) = &modal.detail {
        let lines = detail.lines().count();
        let max_scroll = lines.saturating_sub(chunks[1].height as usize);
        modal.scroll = modal.scroll.min(max_scroll);
        Paragraph::new(detail.as_str())
            .style(Style::default().fg(ctx.text_secondary))
            .scroll((modal.scroll.min(u16::MAX as usize) as u16, 0))
            .render(chunks[1], buf);
    }

    button("OK", Style::default().fg(ctx.modal_border_active)).render(chunks[2], buf);
}

/// Renders the help overlay with wrapped text and scrollbar. Clamps and
/// updates `scroll` so the caller can persist it.
pub fn render_help_overlay(
    area: Rect,
    buf: &mut Buffer,
    title: &str,
    text: &str,
    scroll: &mut usize,
    ctx: &RenderContext,
) {
    let popup_area = centered_rect(area, 80, 80);
    Clear.render(popup_area, buf);

    let help_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Fill(1), Constraint::Length(1)])
        .split(popup_area);
    let text_area = help_layout[0];
    let scrollbar_area = help_layout[1];

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(ctx.border_style(false))
        .style(ctx.surface_style());
    let inner_area = block.inner(text_area);
    block.render(text_area, buf);

    let total_lines = text.lines().count();
    let available_height = inner_area.height as usize;
    let max_scroll = total_lines.saturating_sub(available_height);
    *scroll = (*scroll).min(max_scroll);

    Paragraph::new(text)
        .scroll((*scroll as u16, 0))
        .render(inner_area, buf);

    if total_lines > available_height && scrollbar_area.height > 0 {
        let scrollbar_height = scrollbar_area.height;
        let thumb_size = ((available_height as f64 / total_lines as f64) * scrollbar_height as f64)
            .max(1.0) as u16;
        let thumb_size = thumb_size.min(scrollbar_height);
        let thumb_pos = if max_scroll > 0 {
            ((*scroll as f64 / max_scroll as f64) * (scrollbar_height - thumb_size) as f64) as u16
        } else {
            0
        };

        for y in 0..scrollbar_height {
            let is_thumb = y >= thumb_pos && y < thumb_pos + thumb_size;
            let style = if is_thumb {
                Style::default().bg(ctx.text_primary)
            } else {
                Style::default().bg(ctx.surface)
            };
            buf.set_string(scrollbar_area.x, scrollbar_area.y + y, "█", style);
        }
    }
}

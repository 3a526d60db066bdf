use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Paragraph, Widget},
};

use crate::store::GridState;

#[derive(Default)]
pub struct DebugState {
    pub num_events: usize,
    pub num_frames: usize,
    pub num_key_events: usize,
    pub num_mouse_events: usize,
    pub last_key_event_name: String,
    /// Last store action dispatched (variant name).
    pub last_action: String,
    pub enabled: bool,
    pub generation: u64,
    pub queued: Option<String>,
    pub cached_rows: usize,
}

impl DebugState {
    pub fn on_key(&mut self, event: &crossterm::event::KeyEvent) {
        self.num_key_events += 1;
        self.last_key_event_name = format!("{:?}", event.code);
    }

    /// Snapshot paging counters from the store.
    pub fn observe(&mut self, grid: &GridState) {
        self.generation = grid.pager.generation();
        self.queued = grid
            .pager
            .queued()
            .map(|w| format!("{}-{}", w.start, w.end));
        self.cached_rows = grid.data.len();
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(format!(
            "events={} keys={} mouse={} last_key={} action={} frames={} gen={} queued={} cached={}",
            self.num_events,
            self.num_key_events,
            self.num_mouse_events,
            self.last_key_event_name,
            self.last_action,
            self.num_frames,
            self.generation,
            self.queued.as_deref().unwrap_or("-"),
            self.cached_rows,
        ))
        .render(area, buf);
    }
}

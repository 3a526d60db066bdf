mod common;

use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::Duration;

use common::FakeSource;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use dtgrid::column::SortDirection;
use dtgrid::loader::Loader;
use dtgrid::{App, AppEvent};
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::Terminal;

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn start(source: Arc<FakeSource>) -> (App, Receiver<AppEvent>) {
    let (tx, rx) = channel();
    let loader = Loader::spawn(source, tx.clone()).unwrap();
    let mut app = App::new(tx).with_loader(loader);
    app.start(None);
    (app, rx)
}

/// Feed events back into the app until `done` holds.
fn pump_until(app: &mut App, rx: &Receiver<AppEvent>, done: impl Fn(&App) -> bool) {
    while !done(app) {
        let event = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("timed out waiting for the loader");
        app.event(&event);
    }
}

fn draw(app: &mut App, terminal: &mut Terminal<TestBackend>) -> String {
    terminal
        .draw(|frame| frame.render_widget(&mut *app, frame.area()))
        .unwrap();
    buffer_text(terminal.backend().buffer())
}

fn buffer_text(buf: &Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in 0..area.height {
        for x in 0..area.width {
            out.push_str(buf[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

#[test]
fn test_start_loads_columns_and_first_page() {
    let source = Arc::new(FakeSource::new(500));
    let (mut app, rx) = start(source.clone());
    pump_until(&mut app, &rx, |app| app.grid.total > 0 && !app.is_busy());

    assert_eq!(app.grid.total, 500);
    assert_eq!(app.grid.active_columns().len(), 3);
    assert!(app.grid.data.contains(55));
    assert_eq!(source.fetched(), vec![vec!["0-55".to_string()]]);
}

#[test]
fn test_sort_key_posts_settings_and_reloads() {
    let source = Arc::new(FakeSource::new(500));
    let (mut app, rx) = start(source.clone());
    pump_until(&mut app, &rx, |app| app.grid.total > 0 && !app.is_busy());

    app.event(&key('s'));
    assert!(app.grid.data.is_empty());
    pump_until(&mut app, &rx, |app| app.grid.data.contains(0));

    let settings = source.settings.lock().unwrap();
    assert_eq!(
        settings.last().unwrap().sort_info,
        vec![("a".to_string(), SortDirection::Ascending)]
    );
    assert_eq!(source.fetched().len(), 2);
}

#[test]
fn test_hide_key_posts_visibility() {
    let source = Arc::new(FakeSource::new(500));
    let (mut app, rx) = start(source.clone());
    pump_until(&mut app, &rx, |app| app.grid.total > 0 && !app.is_busy());

    app.event(&key('H'));
    assert_eq!(app.grid.active_columns().len(), 2);

    // Visibility updates report nothing back, so wait on the worker.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while source.visibility.lock().unwrap().is_empty() {
        assert!(std::time::Instant::now() < deadline, "visibility never posted");
        std::thread::sleep(Duration::from_millis(10));
    }
    let visibility = source.visibility.lock().unwrap();
    assert_eq!(visibility[0].get("a"), Some(&false));
}

#[test]
fn test_render_loading_then_rows() {
    let source = Arc::new(FakeSource::new(500));
    let (mut app, rx) = start(source);
    let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();

    let text = draw(&mut app, &mut terminal);
    assert!(text.contains("Loading..."), "{}", text);
    assert!(text.contains("Rows: 0"), "{}", text);

    pump_until(&mut app, &rx, |app| app.grid.total > 0 && !app.is_busy());
    let text = draw(&mut app, &mut terminal);
    assert!(text.contains("row0"), "{}", text);
    assert!(text.contains("Rows: 500"), "{}", text);
    assert!(!text.contains("Loading..."), "{}", text);
}

#[test]
fn test_render_help_and_copy_prompt() {
    let source = Arc::new(FakeSource::new(500));
    let (mut app, rx) = start(source);
    pump_until(&mut app, &rx, |app| app.grid.total > 0 && !app.is_busy());
    let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();

    app.event(&key('?'));
    let text = draw(&mut app, &mut terminal);
    assert!(text.contains("Navigation"), "{}", text);
    app.event(&AppEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
    assert!(!app.show_help);

    app.event(&key(' '));
    app.event(&key('y'));
    let text = draw(&mut app, &mut terminal);
    assert!(text.contains("Copy to Clipboard"), "{}", text);
    assert_eq!(
        app.pending_copy_text().as_deref(),
        Some("a\tb\n0\trow0")
    );

    app.event(&key('n'));
    assert!(!app.confirmation_modal.active);
    assert!(app.grid.selection.is_empty());
}

/// Input collector.
///
/// Drains every pending crossterm event once per frame and turns it into a
/// `UiAction`. Mouse presses stay in screen coordinates: the renderer's hit
/// map owns the mapping from cells to targets.
///
/// Only key presses count. Repeat and Release events are dropped so holding
/// a key doesn't scroll twice on terminals that report both.

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
    MouseEvent, MouseEventKind,
};

/// Rows moved by one wheel notch or arrow press.
const LINE_STEP: i32 = 1;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UiAction {
    Click { col: u16, row: u16 },
    Scroll(i32),
    /// Scroll by this many pages (sign gives direction).
    Page(i32),
    ScrollToEnd(bool),
    /// Keyboard shortcut for the welcome button.
    Start,
    Resize { cols: u16, rows: u16 },
    Quit,
}

pub struct InputState {
    actions: Vec<UiAction>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { actions: Vec::with_capacity(8) }
    }

    /// Drain all pending terminal events without blocking.
    pub fn drain_events(&mut self) -> &[UiAction] {
        self.actions.clear();
        while poll(Duration::ZERO).unwrap_or(false) {
            let ev = match event::read() {
                Ok(ev) => ev,
                Err(e) => {
                    log::warn!("input read failed: {e}");
                    break;
                }
            };
            if let Some(action) = translate(ev) {
                self.actions.push(action);
            }
        }
        &self.actions
    }
}

fn translate(ev: Event) -> Option<UiAction> {
    match ev {
        Event::Key(key) => translate_key(key),
        Event::Mouse(mouse) => translate_mouse(mouse),
        Event::Resize(cols, rows) => Some(UiAction::Resize { cols, rows }),
        _ => None,
    }
}

fn translate_key(key: KeyEvent) -> Option<UiAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
    {
        return Some(UiAction::Quit);
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(UiAction::Quit),
        KeyCode::Enter | KeyCode::Char(' ') => Some(UiAction::Start),
        KeyCode::Up | KeyCode::Char('k') => Some(UiAction::Scroll(-LINE_STEP)),
        KeyCode::Down | KeyCode::Char('j') => Some(UiAction::Scroll(LINE_STEP)),
        KeyCode::PageUp => Some(UiAction::Page(-1)),
        KeyCode::PageDown => Some(UiAction::Page(1)),
        KeyCode::Home => Some(UiAction::ScrollToEnd(false)),
        KeyCode::End => Some(UiAction::ScrollToEnd(true)),
        _ => None,
    }
}

fn translate_mouse(m: MouseEvent) -> Option<UiAction> {
    match m.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(UiAction::Click { col: m.column, row: m.row }),
        MouseEventKind::ScrollDown => Some(UiAction::Scroll(LINE_STEP)),
        MouseEventKind::ScrollUp => Some(UiAction::Scroll(-LINE_STEP)),
        _ => None,
    }
}

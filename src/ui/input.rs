/// Input: per-frame key event drain.
///
/// Slides are edge triggered — a move fires once per key-down event.
/// Terminal key repeat delivers fresh Press/Repeat events while a key is
/// held, which gives held-key sliding for free.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEventKind, KeyModifiers};

pub struct InputState {
    pressed: Vec<KeyCode>,
    ctrl_c: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            pressed: Vec::with_capacity(8),
            ctrl_c: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.pressed.clear();
        self.ctrl_c = false;

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
                {
                    self.ctrl_c = true;
                    continue;
                }
                self.pressed.push(key.code);
            }
        }
    }

    /// Was this key pressed (or auto-repeated) this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    /// Convenience: was any of these keys pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Plain characters typed this frame, in order, for text fields.
    pub fn typed_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.pressed.iter().filter_map(|code| match code {
            KeyCode::Char(c) => Some(*c),
            _ => None,
        })
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.ctrl_c
    }
}

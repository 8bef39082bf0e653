/// Keyboard state tracker.
///
/// Movement keys are level-triggered (held), actions are edge-triggered
/// (fresh press this frame). Terminals only report key releases when the
/// keyboard enhancement protocol is active; elsewhere a key counts as
/// released once its auto-repeat stops for `HOLD_TIMEOUT`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::MoveIntent;

const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
pub const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
pub const KEYS_ECHO: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Char('E'), KeyCode::Char(' ')];
pub const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
pub const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];
pub const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

pub struct InputState {
    /// Last Press/Repeat per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    pub raw_events: Vec<KeyEvent>,
    /// Trust Release events. Set once keyboard enhancement is confirmed.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain pending terminal events without blocking. Once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn apply(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                if !self.is_held(key.code) {
                    self.fresh_presses.push(key.code);
                }
                self.last_active.insert(key.code, now);
            }
        }
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    /// Held movement keys as a normalised intent.
    pub fn intent(&self) -> MoveIntent {
        MoveIntent::from_keys(
            self.any_held(KEYS_UP),
            self.any_held(KEYS_DOWN),
            self.any_held(KEYS_LEFT),
            self.any_held(KEYS_RIGHT),
        )
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    #[test]
    fn first_press_is_fresh_repeat_is_not() {
        let mut kb = InputState::new();
        kb.apply(key(KeyCode::Char('e'), KeyEventKind::Press), Instant::now());
        assert!(kb.any_pressed(KEYS_ECHO));
        kb.fresh_presses.clear();
        kb.apply(key(KeyCode::Char('e'), KeyEventKind::Repeat), Instant::now());
        assert!(!kb.any_pressed(KEYS_ECHO));
        assert!(kb.any_held(KEYS_ECHO));
    }

    #[test]
    fn release_only_honoured_when_enabled() {
        let mut kb = InputState::new();
        kb.apply(key(KeyCode::Left, KeyEventKind::Press), Instant::now());
        kb.apply(key(KeyCode::Left, KeyEventKind::Release), Instant::now());
        assert!(kb.is_held(KeyCode::Left));

        kb.honor_release = true;
        kb.apply(key(KeyCode::Left, KeyEventKind::Release), Instant::now());
        assert!(!kb.is_held(KeyCode::Left));
    }

    #[test]
    fn held_keys_combine_into_intent() {
        let mut kb = InputState::new();
        kb.apply(key(KeyCode::Char('d'), KeyEventKind::Press), Instant::now());
        assert_eq!(kb.intent(), MoveIntent { x: 1.0, y: 0.0 });
        kb.apply(key(KeyCode::Up, KeyEventKind::Press), Instant::now());
        let i = kb.intent();
        assert!(i.x > 0.0 && i.y < 0.0);
        assert!(((i.x * i.x + i.y * i.y).sqrt() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ctrl_c_detected() {
        let mut kb = InputState::new();
        kb.apply(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(kb.ctrl_c_pressed());
    }
}

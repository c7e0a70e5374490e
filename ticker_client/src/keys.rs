//! Keyboard bindings.
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::poller::CADENCE_STEP_MINUTES;

/// What a key press asks the client to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyAction {
    /// Leave the client.
    Quit,
    /// Switch single/dual layout.
    ToggleMode,
    /// Ask the server to change its cadence by this many minutes.
    AdjustCadence(f64),
}

/// Map a key event to an action; releases and unbound keys map to `None`.
pub fn key_action(key: KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(KeyAction::Quit),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char('m') | KeyCode::Char('M') => Some(KeyAction::ToggleMode),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(KeyAction::AdjustCadence(CADENCE_STEP_MINUTES)),
        KeyCode::Char('-') | KeyCode::Char('_') => Some(KeyAction::AdjustCadence(-CADENCE_STEP_MINUTES)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn bindings() {
        assert_eq!(key_action(press(KeyCode::Char('q'))), Some(KeyAction::Quit));
        assert_eq!(key_action(press(KeyCode::Esc)), Some(KeyAction::Quit));
        assert_eq!(
            key_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
        assert_eq!(key_action(press(KeyCode::Char('c'))), None);
        assert_eq!(key_action(press(KeyCode::Char('m'))), Some(KeyAction::ToggleMode));
        assert_eq!(key_action(press(KeyCode::Char('+'))), Some(KeyAction::AdjustCadence(5.0)));
        assert_eq!(key_action(press(KeyCode::Char('-'))), Some(KeyAction::AdjustCadence(-5.0)));
    }

    #[test]
    fn releases_are_ignored() {
        let mut key = press(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;
        assert_eq!(key_action(key), None);
    }
}

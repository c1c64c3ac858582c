//! Key bindings: arrows and vim-style hjkl.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move the drop cursor; `fast` jumps a whole sub-square.
    Move { dx: i32, dy: i32, fast: bool },
    SelectSlot(usize),
    NextSlot,
    Drop,
    Pause,
    Retry,
    Quit,
    None,
}

impl Action {
    /// Held keys auto-repeat only for cursor movement.
    pub fn repeats(self) -> bool {
        matches!(self, Self::Move { .. })
    }
}

/// Map key event to game action. Shift on a movement key moves fast.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let shift = modifiers.contains(KeyModifiers::SHIFT);
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    let mv = |dx, dy, fast| Action::Move { dx, dy, fast };
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Retry,
        KeyCode::Left => mv(-1, 0, shift),
        KeyCode::Right => mv(1, 0, shift),
        KeyCode::Up => mv(0, -1, shift),
        KeyCode::Down => mv(0, 1, shift),
        KeyCode::Char('h') => mv(-1, 0, false),
        KeyCode::Char('l') => mv(1, 0, false),
        KeyCode::Char('k') => mv(0, -1, false),
        KeyCode::Char('j') => mv(0, 1, false),
        KeyCode::Char('H') => mv(-1, 0, true),
        KeyCode::Char('L') => mv(1, 0, true),
        KeyCode::Char('K') => mv(0, -1, true),
        KeyCode::Char('J') => mv(0, 1, true),
        KeyCode::Char(c @ '1'..='3') => Action::SelectSlot(c as usize - '1' as usize),
        KeyCode::Tab => Action::NextSlot,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Drop,
        _ => Action::None,
    }
}

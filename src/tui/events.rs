use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::network::entity::EntityType;

/// Events flowing through the event loop.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic tick for notification TTLs.
    Tick,
    /// Raw terminal input (keyboard/mouse).
    Input(crossterm::event::Event),
}

/// High-level actions resolved from key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CursorDown,
    CursorUp,
    CycleLayout,
    ToggleIsolated,
    ToggleType(EntityType),
    ConfidenceUp,
    ConfidenceDown,
    BeginConnect,
    /// Toggle the cursor node in the connect selection.
    SelectNode,
    /// Cycle the relationship type offered for the selected pair.
    CycleRelationshipType,
    ConfirmConnect,
    /// Delete the first outgoing edge of the cursor node.
    DeleteEdge,
    Refresh,
    Cancel,
    Quit,
}

/// Step for `+`/`-` on the confidence floor.
pub const CONFIDENCE_STEP: u8 = 10;

/// Map a key press to an action. Releases and repeats are ignored.
pub fn map_key(key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(Action::Quit);
    }

    let action = match key.code {
        KeyCode::Char('j') | KeyCode::Down => Action::CursorDown,
        KeyCode::Char('k') | KeyCode::Up => Action::CursorUp,
        KeyCode::Char('l') => Action::CycleLayout,
        KeyCode::Char('i') => Action::ToggleIsolated,
        KeyCode::Char(c @ '1'..='5') => {
            let idx = c as usize - '1' as usize;
            Action::ToggleType(EntityType::ALL[idx])
        }
        KeyCode::Char('+') | KeyCode::Char('=') => Action::ConfidenceUp,
        KeyCode::Char('-') => Action::ConfidenceDown,
        KeyCode::Char('c') => Action::BeginConnect,
        KeyCode::Char(' ') => Action::SelectNode,
        KeyCode::Tab => Action::CycleRelationshipType,
        KeyCode::Enter => Action::ConfirmConnect,
        KeyCode::Char('d') => Action::DeleteEdge,
        KeyCode::Char('r') => Action::Refresh,
        KeyCode::Esc => Action::Cancel,
        KeyCode::Char('q') => Action::Quit,
        _ => return None,
    };
    Some(action)
}

/// Notification level for the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A timed notification shown in the overlay.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub level: NotificationLevel,
    /// Ticks remaining before auto-dismiss.
    pub ttl_ticks: u32,
}

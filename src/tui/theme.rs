//! Teal & coral colour theme for the case-graph TUI.
//!
//! All colour constants are RGB truecolor. Widgets import from here
//! instead of using inline `Color::*` literals.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders};

use crate::core::network::entity::EntityType;

// ── Palette ─────────────────────────────────────────────────────────────────

/// Teal: focused borders, headings.
pub const PRIMARY: Color = Color::Rgb(0x00, 0x80, 0x80);
pub const PRIMARY_LIGHT: Color = Color::Rgb(0x00, 0x96, 0x88);
/// Coral: cursor, calls to action.
pub const ACCENT: Color = Color::Rgb(0xFF, 0x7F, 0x50);
pub const BG_BASE: Color = Color::Rgb(0x0A, 0x19, 0x19);

pub const TEXT: Color = Color::Rgb(0xE0, 0xE0, 0xE0);
pub const TEXT_MUTED: Color = Color::Rgb(0x80, 0x80, 0x80);
pub const TEXT_DIM: Color = Color::Rgb(0x50, 0x50, 0x50);

pub const ERROR: Color = Color::Rgb(0xEF, 0x53, 0x50);
pub const SUCCESS: Color = Color::Rgb(0x66, 0xBB, 0x6A);
pub const WARNING: Color = Color::Rgb(0xFF, 0xA7, 0x26);
pub const INFO: Color = Color::Rgb(0x42, 0xA5, 0xF5);
/// Lavender.
pub const LAVENDER: Color = Color::Rgb(0xCE, 0x93, 0xD8);

/// Tag colour for an entity type.
pub fn entity_color(entity_type: EntityType) -> Color {
    match entity_type {
        EntityType::Person => PRIMARY_LIGHT,
        EntityType::Business => LAVENDER,
        EntityType::Location => WARNING,
        EntityType::PhoneNumber => INFO,
        EntityType::EmailAddress => SUCCESS,
    }
}

// ── Style helpers ───────────────────────────────────────────────────────────

pub fn title() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn heading() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn muted() -> Style {
    Style::default().fg(TEXT_MUTED)
}

/// Key hint style (e.g., "[q]:quit").
pub fn key_hint() -> Style {
    Style::default().fg(TEXT_DIM)
}

/// Status bar brand badge.
pub fn brand_badge() -> Style {
    Style::default()
        .fg(BG_BASE)
        .bg(ACCENT)
        .add_modifier(Modifier::BOLD)
}

/// Connect-mode badge.
pub fn mode_badge() -> Style {
    Style::default()
        .fg(BG_BASE)
        .bg(PRIMARY_LIGHT)
        .add_modifier(Modifier::BOLD)
}

pub fn block_focused(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PRIMARY))
}

//! Shared UI theme constants.

use ratatui::style::Color;

pub const ACCENT: Color = Color::Rgb(120, 180, 255);
pub const ACCENT_ALT: Color = Color::Rgb(190, 120, 255);
pub const MUTED: Color = Color::Rgb(140, 140, 150);

// Scrollbar colors
pub const SB_ARROW: Color = Color::Rgb(170, 170, 180);
pub const SB_TRACK: Color = Color::Rgb(170, 170, 180);
pub const SB_THUMB: Color = Color::Rgb(170, 170, 180);

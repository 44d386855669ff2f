//! Centralized theme and styling for the TUI
//!
//! Single source of truth for colors and text styles used by the screen
//! front-end, so the wizard keeps a consistent look without hardcoding
//! styles in render code.

use ratatui::style::{Color, Modifier, Style};

/// Core color palette for the application
pub struct Colors;

impl Colors {
    /// Primary accent used for titles and the active element
    pub const PRIMARY: Color = Color::Cyan;

    /// Default foreground
    pub const TEXT: Color = Color::Gray;

    /// De-emphasized text (hints, defaults, skipped stages)
    pub const TEXT_DIM: Color = Color::DarkGray;

    /// Successful stage / accepted input
    pub const SUCCESS: Color = Color::Green;

    /// Failed stage / rejected input
    pub const ERROR: Color = Color::Red;

    /// Advisory notes
    pub const WARNING: Color = Color::Yellow;

    /// Highlight background for the selected list entry
    pub const SELECTION_BG: Color = Color::Rgb(40, 40, 60);
}

/// Pre-built styles for common elements
pub struct Styles;

impl Styles {
    pub fn title() -> Style {
        Style::default()
            .fg(Colors::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text() -> Style {
        Style::default().fg(Colors::TEXT)
    }

    pub fn dim() -> Style {
        Style::default().fg(Colors::TEXT_DIM)
    }

    pub fn selected() -> Style {
        Style::default()
            .fg(Colors::PRIMARY)
            .bg(Colors::SELECTION_BG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn input() -> Style {
        Style::default().fg(Color::White)
    }

    pub fn error() -> Style {
        Style::default()
            .fg(Colors::ERROR)
            .add_modifier(Modifier::BOLD)
    }

    pub fn warning() -> Style {
        Style::default().fg(Colors::WARNING)
    }

    pub fn success() -> Style {
        Style::default().fg(Colors::SUCCESS)
    }
}

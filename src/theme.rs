//! Colors used for CLI output.
//!
//! Centralizes the color choices of the diff view, prompts and listings.
//! Colors are dropped when stdout is not a terminal or `NO_COLOR` is set.

use crossterm::style::Color;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Most content
    pub text_primary: Color,
    /// Hints, separators
    pub text_secondary: Color,
    /// Headings and highlighted values
    pub accent: Color,
    /// Removed lines, errors
    pub error: Color,
    /// Added lines, first versions
    pub success: Color,
    /// Whether any escape code is emitted at all
    pub enabled: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text_primary: Color::Grey,
            text_secondary: Color::DarkGrey,
            accent: Color::Cyan,
            error: Color::Red,
            success: Color::Green,
            enabled: true,
        }
    }
}

impl Theme {
    /// Same colors, no escape codes.
    pub fn plain() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn paint(&self, color: Color, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        format!("{}{}{}", color_to_ansi(color), text, ansi::RESET)
    }

    pub fn primary_text(&self, text: &str) -> String {
        self.paint(self.text_primary, text)
    }

    pub fn secondary_text(&self, text: &str) -> String {
        self.paint(self.text_secondary, text)
    }

    pub fn accent_text(&self, text: &str) -> String {
        self.paint(self.accent, text)
    }

    pub fn error_text(&self, text: &str) -> String {
        self.paint(self.error, text)
    }

    pub fn success_text(&self, text: &str) -> String {
        self.paint(self.success, text)
    }
}

/// Raw escape sequences.
pub mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const CYAN: &str = "\x1b[36m";
}

fn color_to_ansi(color: Color) -> &'static str {
    match color {
        Color::Black => "\x1b[30m",
        Color::Red | Color::DarkRed => ansi::RED,
        Color::Green | Color::DarkGreen => ansi::GREEN,
        Color::Yellow | Color::DarkYellow => "\x1b[33m",
        Color::Blue | Color::DarkBlue => "\x1b[34m",
        Color::Magenta | Color::DarkMagenta => "\x1b[35m",
        Color::Cyan | Color::DarkCyan => ansi::CYAN,
        Color::Grey => "\x1b[37m",
        Color::DarkGrey => "\x1b[90m",
        Color::White => "\x1b[97m",
        Color::Reset => ansi::RESET,
        // RGB and indexed colors fall back to no color
        _ => "",
    }
}

/// Theme for the current process: colored on a terminal unless `NO_COLOR`
/// is set.
pub fn current_theme() -> Theme {
    if std::env::var_os("NO_COLOR").is_some() || !atty::is(atty::Stream::Stdout) {
        Theme::plain()
    } else {
        Theme::default()
    }
}

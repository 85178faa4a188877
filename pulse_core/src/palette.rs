//! Index-derived console colors so interleaved instances stay readable.

use crossterm::style::{Color, Stylize};

const PAIRS: [(Color, Color); 6] = [
    (Color::White, Color::DarkBlue),
    (Color::Black, Color::DarkGreen),
    (Color::Black, Color::DarkYellow),
    (Color::White, Color::DarkMagenta),
    (Color::Black, Color::DarkCyan),
    (Color::White, Color::DarkRed),
];

/// A foreground/background pairing for one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    fg: Color,
    bg: Color,
    enabled: bool,
}

impl Palette {
    /// Picks the pair for a 1-based instance index, cycling every six.
    pub fn for_index(index: u32) -> Self {
        let (fg, bg) = PAIRS[index.saturating_sub(1) as usize % PAIRS.len()];
        Self { fg, bg, enabled: true }
    }

    /// No styling at all.
    pub fn plain() -> Self {
        Self {
            fg: Color::Reset,
            bg: Color::Reset,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn paint(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        text.with(self.fg).on(self.bg).to_string()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::plain()
    }
}

//! Terminal console utilities for colorized output

use std::env;
use std::io::{self, IsTerminal};

/// Console output handler with color support
pub struct Console {
    color_enabled: bool,
}

impl Console {
    /// Create a new console with automatic color detection
    pub fn new() -> Self {
        Self {
            color_enabled: io::stdout().is_terminal() && env::var("NO_COLOR").is_err(),
        }
    }

    /// Create a console with colors disabled
    pub fn no_colors() -> Self {
        Self {
            color_enabled: false,
        }
    }

    /// Check if color output is enabled
    pub fn is_color_enabled(&self) -> bool {
        self.color_enabled
    }

    /// Colorize text with the specified color
    pub fn colorize(&self, text: &str, color: Color) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            Color::Red => format!("\x1b[31m{text}\x1b[0m"),
            Color::Green => format!("\x1b[32m{text}\x1b[0m"),
            Color::Yellow => format!("\x1b[33m{text}\x1b[0m"),
            Color::Magenta => format!("\x1b[35m{text}\x1b[0m"),
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// ANSI color codes for terminal output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Magenta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_colors() {
        let console = Console::no_colors();
        assert!(!console.is_color_enabled());
        assert_eq!(console.colorize("test", Color::Red), "test");
    }

    #[test]
    fn test_colorize_wraps_with_ansi_codes() {
        let console = Console {
            color_enabled: true,
        };
        assert_eq!(console.colorize("x", Color::Red), "\x1b[31mx\x1b[0m");
        assert_eq!(console.colorize("x", Color::Green), "\x1b[32mx\x1b[0m");
        assert_eq!(console.colorize("x", Color::Yellow), "\x1b[33mx\x1b[0m");
        assert_eq!(console.colorize("x", Color::Magenta), "\x1b[35mx\x1b[0m");
    }
}

//! Terminal capability detection and text helpers

use owo_colors::{colors::css, OwoColorize};

/// Width assumed when the terminal size is unknown.
const DEFAULT_WIDTH: usize = 80;

/// Detects whether colored output should be enabled
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Detects terminal width, returning None if not available
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Check if terminal is narrow (< 60 columns)
pub fn is_narrow() -> bool {
    terminal_width().is_some_and(|w| w < 60)
}

/// Terminal width in columns, or a default when unknown.
pub fn line_width() -> usize {
    terminal_width().map_or(DEFAULT_WIDTH, usize::from)
}

/// Columns available for a line that starts `used` columns in.
pub fn remaining_width(used: usize) -> usize {
    line_width().saturating_sub(used).max(20)
}

/// The first line of `content`, cut to at most `width` characters.
///
/// An ellipsis marks text that was dropped, either because the line was too
/// long or because there were further lines.
pub fn excerpt(content: &str, width: usize) -> String {
    let mut lines = content.lines().map(str::trim).filter(|line| !line.is_empty());
    let first = lines.next().unwrap_or_default();
    let more = lines.next().is_some();

    let count = first.chars().count();
    if count <= width && !more {
        return first.to_string();
    }

    let keep = width.saturating_sub(1).min(count);
    let mut line: String = first.chars().take(keep).collect();
    line.push('…');
    line
}

/// Extension trait for colorizing output
pub trait Colorize {
    /// Color as success (green)
    fn success(&self) -> String;
    /// Color as warning (amber)
    fn warning(&self) -> String;
    /// Color as info (blue)
    fn info(&self) -> String;
    /// Dim the text
    fn dim(&self) -> String;
}

impl Colorize for str {
    fn success(&self) -> String {
        if supports_color() {
            self.fg::<css::Green>().to_string()
        } else {
            self.to_string()
        }
    }

    fn warning(&self) -> String {
        if supports_color() {
            self.fg::<css::Orange>().to_string()
        } else {
            self.to_string()
        }
    }

    fn info(&self) -> String {
        if supports_color() {
            self.fg::<css::LightBlue>().to_string()
        } else {
            self.to_string()
        }
    }

    fn dim(&self) -> String {
        if supports_color() {
            self.dimmed().to_string()
        } else {
            self.to_string()
        }
    }
}

impl Colorize for String {
    fn success(&self) -> String {
        self.as_str().success()
    }

    fn warning(&self) -> String {
        self.as_str().warning()
    }

    fn info(&self) -> String {
        self.as_str().info()
    }

    fn dim(&self) -> String {
        self.as_str().dim()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::excerpt;

    #[test_case("short", 10, "short"; "fits")]
    #[test_case("a longer line", 6, "a lon…"; "too long")]
    #[test_case("first\nsecond", 20, "first…"; "more lines")]
    #[test_case("\n\n  padded  \n", 20, "padded"; "blank lines skipped")]
    #[test_case("", 10, ""; "empty")]
    fn excerpt_cuts_to_width(content: &str, width: usize, expected: &str) {
        assert_eq!(excerpt(content, width), expected);
    }
}

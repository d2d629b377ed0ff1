//! Styling helpers for console output.
//!
//! [`ConsoleStyle`] applies ANSI styling through the `colored` crate.
//! It is implemented for `&str` and `String`, so literals and formatted
//! output can both be styled in place.

use colored::{ColoredString, Colorize};

/// Convenience trait for applying color and style to console text.
pub trait ConsoleStyle {
    fn name_style(&self) -> ColoredString;
    fn value_style(&self) -> ColoredString;
    fn number_style(&self) -> ColoredString;
    fn error_style(&self) -> ColoredString;
    fn prompt_style(&self) -> ColoredString;
    fn heading_style(&self) -> ColoredString;
    fn note_style(&self) -> ColoredString;
    fn section_style(&self) -> ColoredString;
}

impl ConsoleStyle for &str {
    fn name_style(&self) -> ColoredString {
        self.truecolor(220, 180, 40)
    }
    fn value_style(&self) -> ColoredString {
        self.italic().truecolor(102, 208, 250)
    }
    fn number_style(&self) -> ColoredString {
        self.bold().truecolor(110, 220, 110)
    }
    fn error_style(&self) -> ColoredString {
        self.truecolor(230, 30, 30)
    }
    fn prompt_style(&self) -> ColoredString {
        self.truecolor(223, 77, 10)
    }
    fn heading_style(&self) -> ColoredString {
        self.truecolor(223, 77, 10).underline()
    }
    fn note_style(&self) -> ColoredString {
        self.dimmed().italic()
    }
    fn section_style(&self) -> ColoredString {
        let bracketed = format!("[{self}]");
        bracketed.truecolor(75, 80, 75)
    }
}

impl ConsoleStyle for String {
    fn name_style(&self) -> ColoredString {
        self.as_str().name_style()
    }
    fn value_style(&self) -> ColoredString {
        self.as_str().value_style()
    }
    fn number_style(&self) -> ColoredString {
        self.as_str().number_style()
    }
    fn error_style(&self) -> ColoredString {
        self.as_str().error_style()
    }
    fn prompt_style(&self) -> ColoredString {
        self.as_str().prompt_style()
    }
    fn heading_style(&self) -> ColoredString {
        self.as_str().heading_style()
    }
    fn note_style(&self) -> ColoredString {
        self.as_str().note_style()
    }
    fn section_style(&self) -> ColoredString {
        self.as_str().section_style()
    }
}

//! Terminal output for the interactive host.
//!
//! Assistant answers go to stdout; everything else (prompt, status, warnings)
//! goes to stderr so piped output only carries answers.

use brief::textutil::truncate_with_suffix_by_chars;
use crossterm::style::{Color, Stylize};

const LABEL_AGENT: &str = "brief";
const LABEL_WARNING: &str = "warning:";
const LABEL_ERROR: &str = "error:";
const PROMPT_SYMBOL: &str = ">";
const GLYPH_SECTION_BULLET: &str = "•";
const INDENT: &str = "  ";
const GLYPH_TOOL_RESULT: &str = "\u{2190}";
const TOOL_PREVIEW_CHARS: usize = 400;

const COLOR_AGENT_LABEL: Color = Color::Green;
const COLOR_MODEL_NAME: Color = Color::Yellow;
const COLOR_WARNING: Color = Color::Yellow;
const COLOR_ERROR: Color = Color::Red;
const COLOR_BULLET: Color = Color::DarkGrey;
const COLOR_SECTION_TITLE: Color = Color::White;
const COLOR_FIELD_KEY: Color = Color::DarkGrey;
const COLOR_FIELD_VALUE: Color = Color::Grey;
const COLOR_ACTIVITY: Color = Color::Grey;
const COLOR_TOOL_RESULT: Color = Color::Cyan;

/// Handles all terminal output formatting.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    /// Whether ANSI color/style output is enabled.
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Print the user input prompt indicator (to stderr).
    pub fn prompt(&self) {
        if self.color {
            eprint!("{} ", PROMPT_SYMBOL.with(COLOR_AGENT_LABEL).bold());
        } else {
            eprint!("{PROMPT_SYMBOL} ");
        }
    }

    /// Print the startup banner naming the active model.
    pub fn header(&self, model: &str) {
        if self.color {
            eprintln!(
                "{} ({})",
                LABEL_AGENT.with(COLOR_AGENT_LABEL).bold(),
                model.with(COLOR_MODEL_NAME)
            );
        } else {
            eprintln!("{LABEL_AGENT} ({model})");
        }
    }

    /// Print the assistant's answer (to stdout).
    pub fn assistant_message(&self, content: &str) {
        println!("{}", content.trim_end());
    }

    /// Print a small section header in status-style output.
    pub fn section(&self, title: &str) {
        if self.color {
            eprintln!(
                "{} {}",
                GLYPH_SECTION_BULLET.with(COLOR_BULLET),
                title.with(COLOR_SECTION_TITLE).bold()
            );
        } else {
            eprintln!("{title}:");
        }
    }

    /// Print a key/value line under a status section.
    pub fn field(&self, key: &str, value: &str) {
        if self.color {
            eprintln!(
                "{INDENT}{} {}",
                format!("{key}:").with(COLOR_FIELD_KEY),
                value.with(COLOR_FIELD_VALUE)
            );
        } else {
            eprintln!("{INDENT}{key}: {value}");
        }
    }

    /// Print an activity line for lifecycle updates such as compaction.
    pub fn activity(&self, text: &str) {
        if self.color {
            eprintln!(
                "{} {}",
                GLYPH_SECTION_BULLET.with(COLOR_BULLET),
                text.with(COLOR_ACTIVITY).bold()
            );
        } else {
            eprintln!("{text}");
        }
    }

    /// Print a tool result preview (to stderr).
    pub fn tool_result(&self, result: &str) {
        let preview = truncate_with_suffix_by_chars(result.trim(), TOOL_PREVIEW_CHARS, "...");
        if self.color {
            eprintln!(
                "{INDENT}{} {}",
                GLYPH_TOOL_RESULT.with(COLOR_TOOL_RESULT),
                preview.with(COLOR_FIELD_VALUE)
            );
        } else {
            eprintln!("{INDENT}<- {preview}");
        }
    }

    /// Print a warning (to stderr).
    pub fn warn(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_WARNING.with(COLOR_WARNING).bold());
        } else {
            eprintln!("{LABEL_WARNING} {msg}");
        }
    }

    /// Print an error (to stderr).
    pub fn error(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_ERROR.with(COLOR_ERROR).bold());
        } else {
            eprintln!("{LABEL_ERROR} {msg}");
        }
    }
}

//! Slash-command metadata and parsing.

/// Static slash command metadata used by parsing and `/help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlashCommand {
    pub name: &'static str,
    pub description: &'static str,
}

/// Built-in slash commands for interactive mode.
pub const SLASH_COMMANDS: [SlashCommand; 6] = [
    SlashCommand {
        name: "/context",
        description: "Show estimated context window usage.",
    },
    SlashCommand {
        name: "/compact",
        description: "Summarize older history now.",
    },
    SlashCommand {
        name: "/clear",
        description: "Start over with an empty conversation.",
    },
    SlashCommand {
        name: "/model",
        description: "Switch the model for later turns: /model <id>.",
    },
    SlashCommand {
        name: "/help",
        description: "List available slash commands.",
    },
    SlashCommand {
        name: "/quit",
        description: "Exit interactive mode.",
    },
];

/// Parsed slash command actions consumed by the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommandAction {
    Quit,
    Context,
    Compact,
    Clear,
    Model(Option<String>),
    Help,
    Unknown(String),
}

/// Parse a slash command from user input.
///
/// Returns `None` if the input is not a slash command.
pub fn parse_slash_command(input: &str) -> Option<SlashCommandAction> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let token = words.next().unwrap_or("").to_ascii_lowercase();

    let action = match token.as_str() {
        "/" | "/help" => SlashCommandAction::Help,
        "/quit" | "/exit" | "/q" => SlashCommandAction::Quit,
        "/context" => SlashCommandAction::Context,
        "/compact" => SlashCommandAction::Compact,
        "/clear" => SlashCommandAction::Clear,
        "/model" => SlashCommandAction::Model(words.next().map(str::to_string)),
        other => SlashCommandAction::Unknown(other.to_string()),
    };

    Some(action)
}

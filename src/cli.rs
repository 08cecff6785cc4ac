//! CLI argument parsing via clap.

use clap::Parser;

/// A context-aware chat agent for the terminal. Works with any
/// OpenAI-compatible API.
#[derive(Debug, Parser)]
#[command(name = "brief", version)]
pub struct Args {
    /// Prompt to send. If provided, runs in one-shot mode and exits.
    pub prompt: Option<String>,

    /// Path to config file (default: ./brief.toml or ~/.config/brief/brief.toml).
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Override model name.
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Override API base URL.
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Disable color output.
    #[arg(long = "no-color")]
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;

    #[test]
    fn bare_invocation_is_interactive() {
        let args = Args::parse_from(["brief"]);
        assert!(args.prompt.is_none());
        assert!(args.config.is_none());
        assert!(!args.no_color);
    }

    #[test]
    fn prompt_and_overrides_parse() {
        let args = Args::parse_from([
            "brief",
            "what time is it?",
            "-c",
            "/tmp/brief.toml",
            "--model",
            "llama3",
            "--base-url",
            "http://localhost:11434/v1",
            "--no-color",
        ]);
        assert_eq!(args.prompt.as_deref(), Some("what time is it?"));
        assert_eq!(args.config.as_deref(), Some("/tmp/brief.toml"));
        assert_eq!(args.model.as_deref(), Some("llama3"));
        assert_eq!(args.base_url.as_deref(), Some("http://localhost:11434/v1"));
        assert!(args.no_color);
    }

    #[test]
    fn short_model_flag_parses() {
        let args = Args::parse_from(["brief", "-m", "gpt-4o"]);
        assert_eq!(args.model.as_deref(), Some("gpt-4o"));
    }
}

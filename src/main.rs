//! CLI entry point for brief.

mod cli;
mod commands;
mod render;

use brief::agent::Agent;
use brief::config::{load_config, Config};
use brief::conversation::{Conversation, Message, Provider, Source};
use brief::summary::PasteBuffer;
use brief::tokens::count_words;
use brief::tools::time::CurrentTimeTool;
use brief::tools::ToolRegistry;
use brief::types::Role;
use clap::Parser;
use commands::{parse_slash_command, SlashCommandAction, SLASH_COMMANDS};
use render::Renderer;
use std::collections::HashSet;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();
    let args = cli::Args::parse();

    let loaded = match load_config(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    let mut config = loaded.config;

    // Apply CLI overrides.
    if let Some(model) = &args.model {
        config.api.model = model.trim().to_string();
    }
    if let Some(url) = &args.base_url {
        config.api.base_url = url.trim().trim_end_matches('/').to_string();
    }
    if args.no_color {
        config.display.color = false;
    }

    let renderer = Renderer::new(config.display.color);

    if let Err(e) = config.validate_for_requests() {
        renderer.error(&e.to_string());
        std::process::exit(1);
    }

    let mut tools = ToolRegistry::new();
    tools.register(CurrentTimeTool);
    let agent = Agent::new(&config, tools);
    let mut conversation = agent.start_conversation(
        &config.api.model,
        Provider::from_base_url(&config.api.base_url),
    );

    if let Some(prompt) = args.prompt {
        conversation.push_user(prompt);
        let earlier = tool_output_ids(&conversation);
        let outcome = agent.respond(&mut conversation, None).await;
        let show_tools = config.display.show_tool_output;
        for message in new_tool_output(&conversation, &earlier, show_tools) {
            renderer.tool_result(&message.content);
        }
        match outcome {
            Ok(answer) => renderer.assistant_message(&answer),
            Err(e) => {
                renderer.error(&e.to_string());
                std::process::exit(1);
            }
        }
        return;
    }

    renderer.header(conversation.default_model());
    tracing::debug!(source = %loaded.source, "interactive session started");
    if let Err(e) = run_interactive(&agent, &config, &mut conversation, renderer).await {
        renderer.error(&format!("failed to read input: {e}"));
        std::process::exit(1);
    }
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the `warn` default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_interactive(
    agent: &Agent,
    config: &Config,
    conversation: &mut Conversation,
    renderer: Renderer,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pastes = PasteBuffer::new();

    loop {
        renderer.prompt();
        let Some(line) = lines.next_line().await? else {
            eprintln!();
            return Ok(());
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(action) = parse_slash_command(input) {
            conversation.push_local(input);
            match action {
                SlashCommandAction::Quit => return Ok(()),
                SlashCommandAction::Help => {
                    renderer.section("commands");
                    for cmd in SLASH_COMMANDS {
                        renderer.field(cmd.name, cmd.description);
                    }
                }
                SlashCommandAction::Context => show_context(agent, conversation, renderer),
                SlashCommandAction::Compact => {
                    let model = conversation.default_model().to_string();
                    // Reserving the whole window forces compaction.
                    let reserve = agent.budget(&model).context_size();
                    let result = agent.compact(conversation, &model, reserve).await;
                    report_compaction(result.was_trimmed, result.was_truncated, renderer);
                    if !result.was_trimmed {
                        renderer.activity("nothing to compact");
                    }
                }
                SlashCommandAction::Clear => {
                    conversation.clear();
                    pastes.clear();
                    renderer.activity("conversation cleared");
                }
                SlashCommandAction::Model(Some(model)) => {
                    conversation.set_default_model(model.as_str());
                    renderer.activity(&format!("model set to {model}"));
                }
                SlashCommandAction::Model(None) => {
                    renderer.field("model", conversation.default_model());
                }
                SlashCommandAction::Unknown(cmd) => {
                    renderer.warn(&format!("unknown command {cmd}; try /help"));
                }
            }
            continue;
        }

        let text = match agent.summary() {
            Some(summary) => {
                let paste = summary.process_paste(input, pastes.next_index()).await;
                if paste.was_summarized {
                    let how = if paste.was_truncated {
                        "truncated"
                    } else {
                        "summarized"
                    };
                    renderer.activity(&format!(
                        "long input {how} ({} lines, {} words)",
                        paste.line_count,
                        count_words(input)
                    ));
                }
                let display = paste.display_text.clone();
                pastes.push(paste);
                pastes.resolve(&display)
            }
            None => input.to_string(),
        };

        let model = conversation.default_model().to_string();
        let result = agent
            .compact(conversation, &model, config.summary.reserve_tokens)
            .await;
        report_compaction(result.was_trimmed, result.was_truncated, renderer);

        conversation.push_user(text);
        let earlier = tool_output_ids(conversation);
        let outcome = agent.respond(conversation, None).await;
        let show_tools = config.display.show_tool_output;
        for message in new_tool_output(conversation, &earlier, show_tools) {
            renderer.tool_result(&message.content);
        }
        match outcome {
            Ok(answer) => {
                renderer.assistant_message(&answer);
                conversation.push_assistant(answer, Some(model.as_str()));
            }
            Err(e) => {
                renderer.error(&e.to_string());
                // Shown like an answer but never sent back to the model.
                let notice = conversation.new_message(
                    Role::Assistant,
                    Source::Local,
                    format!("Error: {e}"),
                    Some(model.as_str()),
                );
                if let Err(err) = conversation.append(notice) {
                    tracing::warn!(error = %err, "failed to record error notice");
                }
            }
        }
    }
}

/// Ids of the tool results already in the log.
fn tool_output_ids(conversation: &Conversation) -> HashSet<String> {
    conversation
        .messages()
        .iter()
        .filter(|m| m.source == Source::ToolOutput)
        .map(|m| m.id.clone())
        .collect()
}

/// Tool results added since `earlier` was taken, if tool output is shown.
fn new_tool_output<'a>(
    conversation: &'a Conversation,
    earlier: &HashSet<String>,
    show_tool_output: bool,
) -> Vec<&'a Message> {
    conversation
        .visible_messages(show_tool_output)
        .filter(|m| m.source == Source::ToolOutput && !earlier.contains(&m.id))
        .collect()
}

fn report_compaction(was_trimmed: bool, was_truncated: bool, renderer: Renderer) {
    if was_truncated {
        renderer.warn("summarizer unavailable; older history was truncated");
    } else if was_trimmed {
        renderer.activity("older history summarized");
    }
}

fn show_context(agent: &Agent, conversation: &Conversation, renderer: Renderer) {
    let model = conversation.default_model();
    let budget = agent.budget(model);
    let used = budget.used_tokens(conversation);
    renderer.section("context");
    renderer.field("model", model);
    renderer.field(
        "usage",
        &format!(
            "{used} / {} tokens ({}%)",
            budget.context_size(),
            budget.usage_percent(conversation)
        ),
    );
    renderer.field("remaining", &budget.remaining_tokens(conversation).to_string());
    renderer.field("messages", &conversation.len().to_string());
}

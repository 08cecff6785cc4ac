//! Brief: a context-aware chat engine for OpenAI-compatible APIs.
//!
//! The crate keeps a provenance-tagged [`conversation::Conversation`], tracks
//! how much of the model's context window it uses, summarizes older history
//! (or oversized pastes) when space runs low, and resolves model tool calls
//! against a [`tools::ToolRegistry`] until a final answer arrives.
//!
//! # Quick start
//!
//! ```no_run
//! use brief::agent::Agent;
//! use brief::config::load_config;
//! use brief::conversation::Provider;
//! use brief::tools::ToolRegistry;
//!
//! # async fn example() {
//! let config = load_config(None).unwrap().config;
//! let agent = Agent::new(&config, ToolRegistry::new());
//! let mut conversation = agent.start_conversation(
//!     &config.api.model,
//!     Provider::from_base_url(&config.api.base_url),
//! );
//! conversation.push_user("Hello!");
//! let answer = agent.respond(&mut conversation, None).await.unwrap();
//! println!("{answer}");
//! # }
//! ```

pub mod agent;
pub mod api;
pub mod budget;
pub mod config;
pub mod conversation;
pub mod error;
pub mod summary;
pub mod textutil;
pub mod tokens;
pub mod tools;
pub mod types;

//! Configuration loading.
//!
//! Precedence, lowest to highest:
//! built-in defaults < config file < environment < CLI flags.
//! Connection settings are the exception: `priority = "config"` (or
//! `BRIEF_CONFIG_PRIORITY=config`) lets file values beat the environment.
//! CLI flags are applied by the binary after loading.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

mod defaults;
mod env;
mod sources;
mod types;

pub use sources::ConfigSource;
pub use types::{AgentConfig, ApiConfig, Config, ConfigPriority, DisplayConfig, SummaryConfig};
use types::FileConfig;

/// Resolved config plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
}

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from --config flag).
pub fn load_config(path_override: Option<&str>) -> Result<LoadedConfig, ConfigError> {
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<LoadedConfig, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (config_text, source) =
        sources::read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let parsed: FileConfig = toml::from_str(&config_text)?;
    let config = resolve_config(parsed, &env_lookup)?;
    tracing::debug!(
        source = %source,
        priority = ?config.priority,
        model = %config.api.model,
        base_url = %config.api.base_url,
        "configuration loaded"
    );
    Ok(LoadedConfig { config, source })
}

fn resolve_config<FEnv>(parsed: FileConfig, env_lookup: &FEnv) -> Result<Config, ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    let priority = env::resolve_priority(env_lookup, parsed.priority);
    let api = env::resolve_api(parsed.api, priority, env_lookup)?;
    let mut summary = parsed.summary;
    env::apply_summary_env_overrides(&mut summary, env_lookup);
    validate_summary(&summary)?;

    let mut agent = parsed.agent;
    if agent.max_iterations == 0 {
        return Err(ConfigError::Invalid(
            "agent.max_iterations must be at least 1".into(),
        ));
    }
    agent.system_prompt = agent.system_prompt.trim().to_string();

    Ok(Config {
        api,
        summary,
        agent,
        display: parsed.display,
        priority,
    })
}

fn validate_summary(summary: &SummaryConfig) -> Result<(), ConfigError> {
    if summary.target_tokens == 0 {
        return Err(ConfigError::Invalid(
            "summary.target_tokens must be positive".into(),
        ));
    }
    if summary.preserve_messages == 0 {
        return Err(ConfigError::Invalid(
            "summary.preserve_messages must be at least 1".into(),
        ));
    }
    if !(summary.word_ratio > 0.0 && summary.word_ratio <= 1.0) {
        return Err(ConfigError::Invalid(format!(
            "summary.word_ratio must be in (0, 1], got {}",
            summary.word_ratio
        )));
    }
    Ok(())
}

impl Config {
    /// Reject settings that cannot reach any endpoint.
    ///
    /// The hosted OpenAI endpoint needs a key; local servers do not.
    pub fn validate_for_requests(&self) -> Result<(), ConfigError> {
        if self.api.api_key.is_empty() && self.api.is_default_endpoint() {
            return Err(ConfigError::Invalid(format!(
                "no API key configured for {}; set {} or api.api_key, or point {} at a local server",
                self.api.base_url,
                env::ENV_API_KEY,
                env::ENV_BASE_URL
            )));
        }
        Ok(())
    }
}

pub fn config_root_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::config_dir().or_else(|| dirs::home_dir().map(|home| home.join(".config")))
}

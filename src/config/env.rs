//! Environment variable handling.
//!
//! Connection variables (`OPENAI_API_KEY`, `OPENAI_BASE_URL`, `LLM_MODEL`)
//! compete with the config file according to [`ConfigPriority`]. The
//! `BRIEF_*` tuning variables always override the file.

use crate::error::ConfigError;

use super::types::{ApiConfig, ConfigPriority, FileApiConfig, SummaryConfig};

pub(super) const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub(super) const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub(super) const ENV_MODEL: &str = "LLM_MODEL";
pub(super) const ENV_PRIORITY: &str = "BRIEF_CONFIG_PRIORITY";
pub(super) const ENV_SUMMARY_DISABLED: &str = "BRIEF_SUMMARY_DISABLED";
pub(super) const ENV_SUMMARY_TARGET_TOKENS: &str = "BRIEF_SUMMARY_TARGET_TOKENS";
pub(super) const ENV_API_TIMEOUT_SECS: &str = "BRIEF_API_TIMEOUT_SECS";

/// Non-blank, trimmed env value.
pub(super) fn env_value<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name).and_then(|value| normalized_string(&value))
}

/// Priority from env first, then the file, else `Env`.
pub(super) fn resolve_priority<FEnv>(
    env_lookup: &FEnv,
    file_priority: Option<ConfigPriority>,
) -> ConfigPriority
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_value(env_lookup, ENV_PRIORITY)
        .map(|value| ConfigPriority::parse(&value))
        .or(file_priority)
        .unwrap_or_default()
}

/// Merge file and env connection values, then fill gaps with defaults.
pub(super) fn resolve_api<FEnv>(
    file: FileApiConfig,
    priority: ConfigPriority,
    env_lookup: &FEnv,
) -> Result<ApiConfig, ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    let pick = |file_value: Option<String>, env_name: &str| {
        let file_value = file_value.as_deref().and_then(normalized_string);
        let env_value = env_value(env_lookup, env_name);
        match priority {
            ConfigPriority::Env => env_value.or(file_value),
            ConfigPriority::Config => file_value.or(env_value),
        }
    };

    let defaults = ApiConfig::default();
    let mut api = ApiConfig {
        base_url: pick(file.base_url, ENV_BASE_URL).unwrap_or(defaults.base_url),
        api_key: pick(file.api_key, ENV_API_KEY).unwrap_or_default(),
        model: pick(file.model, ENV_MODEL).unwrap_or(defaults.model),
        timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs).max(1),
        context_limit: file.context_limit.filter(|limit| *limit > 0),
    };
    if let Some(timeout) = env_value(env_lookup, ENV_API_TIMEOUT_SECS) {
        let parsed = timeout.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid {ENV_API_TIMEOUT_SECS} value `{timeout}`: expected positive integer seconds"
            ))
        })?;
        api.timeout_secs = parsed.max(1);
    }
    Ok(api)
}

/// Apply `BRIEF_SUMMARY_*` overrides.
pub(super) fn apply_summary_env_overrides<FEnv>(summary: &mut SummaryConfig, env_lookup: &FEnv)
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(value) = env_value(env_lookup, ENV_SUMMARY_DISABLED) {
        summary.enabled = !parse_flag(&value);
    }
    if let Some(value) = env_value(env_lookup, ENV_SUMMARY_TARGET_TOKENS) {
        match value.parse::<usize>().ok().filter(|n| *n > 0) {
            Some(parsed) => summary.target_tokens = parsed,
            None => tracing::warn!(
                value = %value,
                "ignoring {ENV_SUMMARY_TARGET_TOKENS}: expected positive integer"
            ),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub(super) fn normalized_string(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

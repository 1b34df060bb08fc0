use crate::error::ErrorContext;
use crate::types::{Config, LeviathanError};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variables that carry source credentials.
pub const API_KEY_ENV_VARS: [(&str, &str); 3] = [
    ("securitytrails", "SECURITYTRAILS_API_KEY"),
    ("shodan", "SHODAN_API_KEY"),
    ("virustotal", "VIRUSTOTAL_API_KEY"),
];

/// Defaults, then the optional TOML file, then the environment.
pub fn load_config(config_path: Option<&Path>) -> Result<Config, LeviathanError> {
    let mut config = Config::default();

    if let Some(path) = config_path {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        apply_toml(&mut config, &contents)?;
    }

    apply_env_overrides(&mut config, |name| env::var(name).ok());
    validate_config(&config)?;

    Ok(config)
}

pub fn apply_toml(config: &mut Config, contents: &str) -> Result<(), LeviathanError> {
    let toml_config: toml::Value =
        toml::from_str(contents).with_context(|| "Failed to parse config file".to_string())?;

    let table = match toml_config.as_table() {
        Some(table) => table,
        None => return Ok(()),
    };

    if let Some(secs) = get_integer(table, "timeout")? {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(proxy) = get_string(table, "proxy")? {
        config.proxy = Some(proxy);
    }
    if let Some(user_agent) = get_string(table, "user_agent")? {
        config.user_agent = user_agent;
    }
    if let Some(concurrency) = get_integer(table, "concurrency")? {
        config.resolver.concurrency = usize::try_from(concurrency)
            .with_context(|| "concurrency is out of range".to_string())?;
    }
    if let Some(attempts) = get_integer(table, "retry_attempts")? {
        config.retry.max_attempts = u32::try_from(attempts)
            .with_context(|| "retry_attempts is out of range".to_string())?;
    }
    if let Some(delay_ms) = get_integer(table, "retry_delay_ms")? {
        config.retry.delay = Duration::from_millis(delay_ms);
    }
    if let Some(sources) = get_string_array(table, "sources")? {
        config.sources = sources;
    }
    if let Some(nameservers) = get_string_array(table, "nameservers")? {
        config.resolver.nameservers = nameservers;
    }
    if let Some(value) = table.get("use_system_resolver") {
        config.resolver.use_system_resolver = value
            .as_bool()
            .ok_or_else(|| type_error("use_system_resolver", "a boolean"))?;
    }

    if let Some(api_keys) = table.get("api_keys") {
        let api_keys_table = api_keys
            .as_table()
            .ok_or_else(|| type_error("api_keys", "a table"))?;
        for (source, value) in api_keys_table {
            let key = value
                .as_str()
                .ok_or_else(|| type_error(&format!("api_keys.{}", source), "a string"))?;
            config.api_keys.insert(source.to_lowercase(), key.to_string());
        }
    }

    Ok(())
}

/// Non-empty environment values replace file-provided keys.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (source, var) in API_KEY_ENV_VARS {
        if let Some(key) = lookup(var).filter(|k| !k.trim().is_empty()) {
            config.api_keys.insert(source.to_string(), key);
        }
    }
}

pub fn validate_config(config: &Config) -> Result<(), LeviathanError> {
    if config.timeout.is_zero() {
        return Err(LeviathanError::ConfigError("Timeout must be greater than 0".to_string()));
    }
    if config.retry.max_attempts == 0 {
        return Err(LeviathanError::ConfigError(
            "Retry attempts must be greater than 0".to_string(),
        ));
    }
    if config.resolver.concurrency == 0 {
        return Err(LeviathanError::ConfigError(
            "Concurrency must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn type_error(key: &str, expected: &str) -> LeviathanError {
    LeviathanError::ConfigError(format!("Config key `{}` must be {}", key, expected))
}

fn get_integer(table: &toml::Table, key: &str) -> Result<Option<u64>, LeviathanError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_integer()
            .and_then(|v| u64::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| type_error(key, "a non-negative integer")),
    }
}

fn get_string(table: &toml::Table, key: &str) -> Result<Option<String>, LeviathanError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| type_error(key, "a string")),
    }
}

fn get_string_array(table: &toml::Table, key: &str) -> Result<Option<Vec<String>>, LeviathanError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => {
            let array = value
                .as_array()
                .ok_or_else(|| type_error(key, "an array of strings"))?;
            array
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Some)
                .ok_or_else(|| type_error(key, "an array of strings"))
        }
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use copo_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: overrides > env > file > default):".to_string()];
    for (key, value, env_keys) in effective_values(&config) {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

type Field = (&'static str, String, &'static [&'static str]);

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Field {
    (key, value, env_keys)
}

fn effective_values(config: &AppConfig) -> Vec<Field> {
    let system_prompt = match &config.agent.system_prompt {
        Some(prompt) => format!("<custom, {} chars>", prompt.chars().count()),
        None => "<built-in>".to_string(),
    };

    vec![
        field("database.url", config.database.url.clone(), &["COPO_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["COPO_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["COPO_DATABASE_TIMEOUT_SECS"],
        ),
        field("llm.provider", config.llm.provider.as_str().to_string(), &["COPO_LLM_PROVIDER"]),
        field("llm.model", config.llm.model.clone(), &["COPO_LLM_MODEL", "GEMINI_MODEL"]),
        field(
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["COPO_LLM_BASE_URL"],
        ),
        field(
            "llm.api_key",
            config.llm.api_key.as_ref().map(redact_secret).unwrap_or_else(|| "<unset>".to_string()),
            &["COPO_LLM_API_KEY", "GEMINI_API_KEY"],
        ),
        field("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["COPO_LLM_TIMEOUT_SECS"]),
        field("llm.max_retries", config.llm.max_retries.to_string(), &["COPO_LLM_MAX_RETRIES"]),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["COPO_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["COPO_SERVER_PORT", "API_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["COPO_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "agent.max_tool_turns",
            config.agent.max_tool_turns.to_string(),
            &["COPO_AGENT_MAX_TOOL_TURNS"],
        ),
        field("agent.system_prompt", system_prompt, &[]),
        field("response.header", preview(&config.response.header), &[]),
        field("response.footer", preview(&config.response.footer), &[]),
        field("logging.level", config.logging.level.clone(), &["COPO_LOGGING_LEVEL", "COPO_LOG_LEVEL"]),
        field(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["COPO_LOGGING_FORMAT", "COPO_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("copo.toml"), PathBuf::from("config/copo.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// First line only, shortened to 40 characters.
fn preview(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    let mut shortened = first_line.chars().take(40).collect::<String>();
    if shortened.len() < text.len() {
        shortened.push('…');
    }
    format!("{shortened:?}")
}

fn redact_secret(secret: &SecretString) -> String {
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let visible = trimmed.chars().take(4).collect::<String>();
    if visible.len() == trimmed.len() {
        return "<redacted>".to_string();
    }
    format!("{visible}***")
}

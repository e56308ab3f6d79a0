use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clientele_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: EXIT_CONFIG,
                output: format!("config validation failed: {error}"),
            };
        }
    };

    let file_path = detect_config_path();
    let file_doc = load_config_file_doc(file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, file_doc.as_ref(), file_path.as_deref())
    };

    let store = &config.store;
    let fields: Vec<(&str, String, &[&str])> = vec![
        ("store.backend", store.backend.as_str().to_string(), &["CLIENTELE_STORE_BACKEND"]),
        ("store.url", display_or_unset(&store.url), &["CLIENTELE_STORE_URL", "SUPABASE_URL"]),
        (
            "store.access_key",
            redact_key(store.access_key.expose_secret()),
            &["CLIENTELE_STORE_ACCESS_KEY", "SUPABASE_KEY"],
        ),
        ("store.table", store.table.clone(), &["CLIENTELE_STORE_TABLE", "DB"]),
        ("store.timeout_secs", store.timeout_secs.to_string(), &["CLIENTELE_STORE_TIMEOUT_SECS"]),
        (
            "store.max_connections",
            store.max_connections.to_string(),
            &["CLIENTELE_STORE_MAX_CONNECTIONS"],
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["CLIENTELE_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), &["CLIENTELE_SERVER_PORT"]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["CLIENTELE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["CLIENTELE_LOGGING_LEVEL", "CLIENTELE_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["CLIENTELE_LOGGING_FORMAT", "CLIENTELE_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        fields.iter().map(|(key, value, env_keys)| render_line(key, value, source(key, env_keys))),
    );

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("clientele.toml"), PathBuf::from("config/clientele.toml")]
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
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

fn display_or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "<unset>".to_string()
    } else {
        value.to_string()
    }
}

/// Keeps the `sb_<kind>_` prefix of hosted-store keys so operators can tell
/// publishable from secret keys.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<unset>".to_string();
    }

    if let Some(rest) = trimmed.strip_prefix("sb_") {
        if let Some((kind, _)) = rest.split_once('_') {
            return format!("sb_{kind}_***");
        }
    }

    "<redacted>".to_string()
}

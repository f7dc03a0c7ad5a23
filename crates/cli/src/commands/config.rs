use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use expensy_core::config::AppConfig;
use serde::Serialize;
use toml::Value;

use crate::commands::{CommandResult, RuntimeOptions};

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run(options: &RuntimeOptions) -> CommandResult {
    let config = match AppConfig::load(options.load_options()) {
        Ok(config) => config,
        Err(error) => return CommandResult::misconfigured("config", &error),
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let attribute = |key: &'static str, value: String, env_keys: &[&str]| ConfigEntry {
        key,
        value,
        source: field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref()),
    };

    let approvals = &config.approvals;
    let default_chain = if approvals.default_chain.is_empty() {
        "<unset>".to_string()
    } else {
        approvals.default_chain.join(", ")
    };
    let entries = vec![
        attribute(
            "approvals.fallback_to_manager",
            approvals.fallback_to_manager.to_string(),
            &["EXPENSY_APPROVALS_FALLBACK_TO_MANAGER"],
        ),
        attribute("approvals.default_chain", default_chain, &["EXPENSY_APPROVALS_DEFAULT_CHAIN"]),
        attribute(
            "approvals.default_min_approval_pct",
            approvals.default_min_approval_pct.to_string(),
            &["EXPENSY_APPROVALS_DEFAULT_MIN_APPROVAL_PCT"],
        ),
        attribute(
            "approvals.allow_zero_threshold",
            approvals.allow_zero_threshold.to_string(),
            &["EXPENSY_APPROVALS_ALLOW_ZERO_THRESHOLD"],
        ),
        attribute(
            "approvals.high_value_threshold",
            approvals.high_value_threshold.to_string(),
            &["EXPENSY_APPROVALS_HIGH_VALUE_THRESHOLD"],
        ),
        attribute(
            "logging.level",
            config.logging.level.clone(),
            &["EXPENSY_LOGGING_LEVEL", "EXPENSY_LOG_LEVEL"],
        ),
        attribute(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["EXPENSY_LOGGING_FORMAT", "EXPENSY_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries.iter().map(render_line));

    CommandResult::success_with_data("config", lines.join("\n"), entries)
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("expensy.toml"), PathBuf::from("config/expensy.toml")]
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
    if let Some(env_key) = env_keys.iter().find(|key| env_is_set(key)) {
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

fn env_is_set(key: &str) -> bool {
    env::var(key).is_ok_and(|value| !value.trim().is_empty())
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

fn render_line(entry: &ConfigEntry) -> String {
    format!("- {} = {} (source: {})", entry.key, entry.value, entry.source)
}

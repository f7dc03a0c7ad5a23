pub mod config;
pub mod expenses;
pub mod path;
pub mod rules;
pub mod seed;
pub mod vote;

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use expensy_core::config::{AppConfig, ConfigError, LoadOptions};
use expensy_core::fixtures::{Dataset, SeedReport};
use expensy_core::{
    ApplicationError, ApprovalError, ApprovalService, InMemoryAuditSink, InterfaceError,
    OrgDirectory,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    pub config_path: Option<PathBuf>,
    pub dataset_path: Option<PathBuf>,
}

impl RuntimeOptions {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            ..LoadOptions::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: impl Serialize,
    ) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 1);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            user_message: None,
            correlation_id: None,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            user_message: None,
            correlation_id: None,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Engine rejection, exit code 1.
    pub fn rejected(command: &str, error: &ApprovalError) -> Self {
        let interface = ApplicationError::from(error.clone()).into_interface(new_correlation_id());
        Self::interface_failure(command, error.class(), error.to_string(), &interface, 1)
    }

    /// Configuration failure, exit code 2.
    pub fn misconfigured(command: &str, error: &ConfigError) -> Self {
        let interface =
            ApplicationError::Configuration(error.to_string()).into_interface(new_correlation_id());
        Self::interface_failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            &interface,
            2,
        )
    }

    fn interface_failure(
        command: &str,
        error_class: &str,
        message: String,
        interface: &InterfaceError,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message,
            user_message: Some(interface.user_message().to_string()),
            correlation_id: Some(interface.correlation_id().to_string()),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// A service populated from the demo dataset, or from `--dataset` when given.
pub struct Session {
    pub service: ApprovalService,
    pub report: SeedReport,
}

impl Session {
    pub fn open(command: &str, options: &RuntimeOptions) -> Result<Self, CommandResult> {
        let config = AppConfig::load(options.load_options())
            .map_err(|error| CommandResult::misconfigured(command, &error))?;

        let dataset = load_dataset(options).map_err(|error| {
            CommandResult::failure(command, "dataset", format!("{error:#}"), 1)
        })?;

        let service =
            ApprovalService::new(&config, OrgDirectory::default(), InMemoryAuditSink::default());
        let report = dataset.load_into(&service).map_err(|error| {
            CommandResult::failure(command, "dataset", format!("dataset rejected: {error}"), 1)
        })?;

        Ok(Self { service, report })
    }
}

fn load_dataset(options: &RuntimeOptions) -> anyhow::Result<Dataset> {
    let Some(path) = options.dataset_path.as_deref() else {
        return Dataset::demo().context("built-in demo dataset is malformed");
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read dataset `{}`", path.display()))?;
    Dataset::from_json(&raw).with_context(|| format!("invalid dataset `{}`", path.display()))
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

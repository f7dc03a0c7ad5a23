use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::approvals::ChainPolicy;
use crate::domain::employee::EmployeeId;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub approvals: ApprovalsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApprovalsConfig {
    pub fallback_to_manager: bool,
    pub default_chain: Vec<String>,
    pub default_min_approval_pct: u8,
    pub allow_zero_threshold: bool,
    pub high_value_threshold: Decimal,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub fallback_to_manager: Option<bool>,
    pub default_chain: Option<Vec<String>>,
    pub default_min_approval_pct: Option<u8>,
    pub allow_zero_threshold: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            approvals: ApprovalsConfig {
                fallback_to_manager: true,
                default_chain: Vec::new(),
                default_min_approval_pct: 100,
                allow_zero_threshold: true,
                high_value_threshold: Decimal::new(1_000, 0),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("expensy.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn chain_policy(&self) -> ChainPolicy {
        ChainPolicy {
            fallback_to_manager: self.approvals.fallback_to_manager,
            default_chain: self.approvals.default_chain.iter().map(EmployeeId::new).collect(),
            default_min_approval_pct: self.approvals.default_min_approval_pct,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(approvals) = patch.approvals {
            if let Some(fallback_to_manager) = approvals.fallback_to_manager {
                self.approvals.fallback_to_manager = fallback_to_manager;
            }
            if let Some(default_chain) = approvals.default_chain {
                self.approvals.default_chain = default_chain;
            }
            if let Some(default_min_approval_pct) = approvals.default_min_approval_pct {
                self.approvals.default_min_approval_pct = default_min_approval_pct;
            }
            if let Some(allow_zero_threshold) = approvals.allow_zero_threshold {
                self.approvals.allow_zero_threshold = allow_zero_threshold;
            }
            if let Some(high_value_threshold) = approvals.high_value_threshold {
                self.approvals.high_value_threshold = high_value_threshold;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("EXPENSY_APPROVALS_FALLBACK_TO_MANAGER") {
            self.approvals.fallback_to_manager =
                parse_bool("EXPENSY_APPROVALS_FALLBACK_TO_MANAGER", &value)?;
        }
        if let Some(value) = read_env("EXPENSY_APPROVALS_DEFAULT_CHAIN") {
            self.approvals.default_chain = split_list(&value);
        }
        if let Some(value) = read_env("EXPENSY_APPROVALS_DEFAULT_MIN_APPROVAL_PCT") {
            self.approvals.default_min_approval_pct =
                parse_u8("EXPENSY_APPROVALS_DEFAULT_MIN_APPROVAL_PCT", &value)?;
        }
        if let Some(value) = read_env("EXPENSY_APPROVALS_ALLOW_ZERO_THRESHOLD") {
            self.approvals.allow_zero_threshold =
                parse_bool("EXPENSY_APPROVALS_ALLOW_ZERO_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("EXPENSY_APPROVALS_HIGH_VALUE_THRESHOLD") {
            self.approvals.high_value_threshold =
                parse_decimal("EXPENSY_APPROVALS_HIGH_VALUE_THRESHOLD", &value)?;
        }

        let log_level = read_env("EXPENSY_LOGGING_LEVEL").or_else(|| read_env("EXPENSY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("EXPENSY_LOGGING_FORMAT").or_else(|| read_env("EXPENSY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(fallback_to_manager) = overrides.fallback_to_manager {
            self.approvals.fallback_to_manager = fallback_to_manager;
        }
        if let Some(default_chain) = overrides.default_chain {
            self.approvals.default_chain = default_chain;
        }
        if let Some(default_min_approval_pct) = overrides.default_min_approval_pct {
            self.approvals.default_min_approval_pct = default_min_approval_pct;
        }
        if let Some(allow_zero_threshold) = overrides.allow_zero_threshold {
            self.approvals.allow_zero_threshold = allow_zero_threshold;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_approvals(&self.approvals)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("expensy.toml"), PathBuf::from("config/expensy.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_approvals(approvals: &ApprovalsConfig) -> Result<(), ConfigError> {
    if approvals.default_min_approval_pct > 100 {
        return Err(ConfigError::Validation(
            "approvals.default_min_approval_pct must be in range 0..=100".to_string(),
        ));
    }

    if approvals.default_min_approval_pct == 0 && !approvals.allow_zero_threshold {
        return Err(ConfigError::Validation(
            "approvals.default_min_approval_pct is 0 but approvals.allow_zero_threshold is false"
                .to_string(),
        ));
    }

    if approvals.default_chain.iter().any(|approver| approver.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "approvals.default_chain must not contain blank approver ids".to_string(),
        ));
    }

    if approvals.high_value_threshold <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "approvals.high_value_threshold must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty()).map(str::to_string).collect()
}

fn parse_u8(key: &str, value: &str) -> Result<u8, ConfigError> {
    value.trim().parse::<u8>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    approvals: Option<ApprovalsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApprovalsPatch {
    fallback_to_manager: Option<bool>,
    default_chain: Option<Vec<String>>,
    default_min_approval_pct: Option<u8>,
    allow_zero_threshold: Option<bool>,
    high_value_threshold: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

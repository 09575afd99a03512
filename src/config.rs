use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    graph::{DEFAULT_COMPACT_BREAKPOINT_PX, LayoutProfile},
    job::PollPolicy,
};

pub const DEFAULT_CONFIG_FILE: &str = "pin.jsonc";
pub const API_URL_ENV: &str = "PIN_API_URL";

const SCHEMA_FILE: &str = "pin.schema.json";
const BUNDLED_SCHEMA: &str = include_str!("../pin.schema.json");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_submit_timeout_ms() -> u64 {
    300_000
}

fn default_stock_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_poll_timeout_ms() -> u64 {
    300_000
}

fn default_enabled_true() -> bool {
    true
}

fn default_enrichment_delay_ms() -> u64 {
    500
}

fn default_viewport_width_px() -> u32 {
    1280
}

fn default_compact_breakpoint_px() -> u32 {
    DEFAULT_COMPACT_BREAKPOINT_PX
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/pin")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,
    #[serde(default = "default_stock_timeout_ms")]
    pub stock_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            submit_timeout_ms: default_submit_timeout_ms(),
            stock_timeout_ms: default_stock_timeout_ms(),
        }
    }
}

impl ApiConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn stock_timeout(&self) -> Duration {
        Duration::from_millis(self.stock_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_poll_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl PollingConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.interval_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_enabled_true")]
    pub enabled: bool,
    #[serde(default = "default_enrichment_delay_ms")]
    pub delay_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: default_enrichment_delay_ms(),
        }
    }
}

impl EnrichmentConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_viewport_width_px")]
    pub viewport_width_px: u32,
    #[serde(default = "default_compact_breakpoint_px")]
    pub compact_breakpoint_px: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            viewport_width_px: default_viewport_width_px(),
            compact_breakpoint_px: default_compact_breakpoint_px(),
        }
    }
}

impl LayoutConfig {
    pub fn profile(&self) -> LayoutProfile {
        LayoutProfile::for_viewport(self.viewport_width_px, self.compact_breakpoint_px)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema = load_schema(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize pin config")?;
        if config.logging.dir.is_relative() {
            config.logging.dir = config_base.join(&config.logging.dir);
        }

        Ok(config)
    }

    /// Loads `explicit` when given. Otherwise reads `pin.jsonc` from the working
    /// directory, falling back to built-in defaults when that file is absent.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Applies environment overrides and returns the variables that took effect.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();
        if let Some(base_url) = lookup(API_URL_ENV).filter(|value| !value.trim().is_empty()) {
            tracing::debug!(target: "config", base_url = %base_url.trim(), "api_base_url_overridden");
            self.api.base_url = base_url.trim().to_string();
            applied.push(API_URL_ENV);
        }
        applied
    }
}

fn load_schema(config_base: &Path, config_value: &Value) -> Result<Value> {
    let schema_content = match resolve_schema_path(config_base, config_value) {
        Some(schema_path) => fs::read_to_string(&schema_path)
            .with_context(|| format!("failed to read schema {}", schema_path.display()))?,
        None => BUNDLED_SCHEMA.to_string(),
    };
    serde_json::from_str(&schema_content).context("failed to parse config schema")
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Option<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Some(configured);
        }
        return Some(config_base.join(&configured));
    }

    let local_default = config_base.join(SCHEMA_FILE);
    local_default.exists().then_some(local_default)
}

fn validate_against_schema(config_value: &Value, schema: &Value) -> Result<()> {
    let compiled =
        JSONSchema::compile(schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}

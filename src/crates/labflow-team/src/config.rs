//! Layered configuration
//!
//! Loads configuration from, in increasing precedence:
//! 1. Default values
//! 2. User-level config: ~/.labflow/labflow.toml
//! 3. Project-level config: ./.labflow/labflow.toml
//! 4. An explicit file (`--config`)
//!
//! Files are merged table by table, so a later file only replaces the keys
//! it actually sets. String values of the form `${VAR}` are expanded from the
//! environment after merging.

use crate::agent::{BackendRegistry, Tier};
use crate::error::{Result, TeamError};
use labflow_core::DEFAULT_STEP_CEILING;
use labflow_llm::{LlmError, OpenAiClient, RemoteLlmConfig, OPENAI_BASE_URL};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

/// Complete configuration of a research team
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    pub workflow: WorkflowConfig,
    pub models: ModelsConfig,
    pub logging: LoggingConfig,
}

/// `[workflow]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Maximum node invocations per run
    pub step_ceiling: usize,

    /// Directory shared by every agent for artifacts
    pub working_directory: PathBuf,

    /// Directory with `<role>.txt` instruction overrides
    pub prompts_dir: Option<PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            step_ceiling: DEFAULT_STEP_CEILING,
            working_directory: PathBuf::from("./data_storage/"),
            prompts_dir: None,
        }
    }
}

/// `[models.*]` sections, one per tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub light: ModelConfig,
    pub power: ModelConfig,
    pub structured: ModelConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            light: ModelConfig::openai("gpt-3.5-turbo"),
            power: ModelConfig::openai("gpt-4o"),
            structured: ModelConfig::openai("gpt-4o"),
        }
    }
}

impl ModelsConfig {
    pub fn tier(&self, tier: Tier) -> &ModelConfig {
        match tier {
            Tier::Light => &self.light,
            Tier::Power => &self.power,
            Tier::Structured => &self.structured,
        }
    }
}

/// Backend settings of one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// API base URL, without `/chat/completions`
    pub base_url: String,

    pub model: String,

    /// API key (supports `${VAR}` interpolation)
    pub api_key: String,

    pub temperature: Option<f32>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ModelConfig {
    fn openai(model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..Default::default()
        }
    }

    /// Remote backend settings, failing when the API key never resolved
    pub fn remote(&self) -> std::result::Result<RemoteLlmConfig, LlmError> {
        let key = self.api_key.trim();
        if key.is_empty() || env_reference().is_match(key) {
            return Err(LlmError::ApiKeyNotFound(format!(
                "no API key for model '{}' (set it in [models] or the environment)",
                self.model
            )));
        }

        let mut config = RemoteLlmConfig::new(key, &self.base_url, &self.model)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        Ok(config)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_string(),
            model: "gpt-4o".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            temperature: Some(0.0),
            timeout_secs: 120,
        }
    }
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl TeamConfig {
    /// Reject values the workflow cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workflow.step_ceiling == 0 {
            return Err(TeamError::config("workflow.step_ceiling must be greater than zero"));
        }
        for tier in [Tier::Light, Tier::Power, Tier::Structured] {
            let model = self.models.tier(tier);
            if model.model.trim().is_empty() {
                return Err(TeamError::config(format!("models.{}.model must not be empty", tier)));
            }
            if model.timeout_secs == 0 {
                return Err(TeamError::config(format!(
                    "models.{}.timeout_secs must be greater than zero",
                    tier
                )));
            }
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TeamError::config(format!("Failed to render config: {}", e)))
    }
}

fn env_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static pattern is valid"))
}

/// Expand `${VAR}` references; unset variables are left as written
pub fn expand_env_vars(value: &str) -> String {
    env_reference()
        .replace_all(value, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

fn expand_in_place(value: &mut toml::Value) {
    match value {
        toml::Value::String(text) => *text = expand_env_vars(text),
        toml::Value::Array(items) => items.iter_mut().for_each(expand_in_place),
        toml::Value::Table(table) => table.iter_mut().for_each(|(_, v)| expand_in_place(v)),
        _ => {}
    }
}

/// Merge `overlay` into `base`; tables merge recursively, anything else is replaced
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Configuration loader handling user, project and explicit files
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    project_config_path: PathBuf,
    explicit_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            user_config_path: dirs::home_dir().map(|home| home.join(".labflow").join("labflow.toml")),
            project_config_path: PathBuf::from(".labflow").join("labflow.toml"),
            explicit_path: None,
        }
    }

    /// Add a file that takes precedence over both default locations
    ///
    /// Unlike the default locations, this file must exist.
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    pub fn user_config_path(&self) -> Option<&Path> {
        self.user_config_path.as_deref()
    }

    pub fn project_config_path(&self) -> &Path {
        &self.project_config_path
    }

    /// Load, merge, expand and validate
    pub async fn load(&self) -> Result<TeamConfig> {
        let mut merged = toml::Value::try_from(TeamConfig::default())
            .map_err(|e| TeamError::config(format!("Failed to encode defaults: {}", e)))?;

        if let Some(user) = &self.user_config_path {
            self.merge_optional(&mut merged, user).await?;
        }
        self.merge_optional(&mut merged, &self.project_config_path).await?;

        if let Some(explicit) = &self.explicit_path {
            if !explicit.exists() {
                return Err(TeamError::config(format!("Config file not found: {}", explicit.display())));
            }
            deep_merge(&mut merged, Self::read(explicit).await?);
            debug!(path = %explicit.display(), "loaded explicit config");
        }

        expand_in_place(&mut merged);
        let config: TeamConfig = merged.try_into()?;
        config.validate()?;

        info!(
            step_ceiling = config.workflow.step_ceiling,
            working_directory = %config.workflow.working_directory.display(),
            "configuration loaded"
        );
        Ok(config)
    }

    async fn merge_optional(&self, merged: &mut toml::Value, path: &Path) -> Result<()> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(());
        }
        deep_merge(merged, Self::read(path).await?);
        debug!(path = %path.display(), "loaded config file");
        Ok(())
    }

    async fn read(path: &Path) -> Result<toml::Value> {
        let content = fs::read_to_string(path).await?;
        let table: toml::Table = toml::from_str(&content)?;
        Ok(toml::Value::Table(table))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Build one remote backend per tier
pub fn backends_from_config(models: &ModelsConfig) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    for tier in [Tier::Light, Tier::Power, Tier::Structured] {
        let client = OpenAiClient::new(models.tier(tier).remote()?)?;
        registry = registry.with_tier(tier, Arc::new(client));
    }
    Ok(registry)
}

//! Runtime configuration for codejudge
//!
//! Configuration is read from a TOML file (`codejudge.toml` in the working
//! directory unless `--config` names one), then environment overrides are
//! applied on top.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{JudgeError, Result};

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "codejudge.toml";

/// Default backend URL (local Ollama daemon)
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:11434";

/// Default model for the four analysis stages
pub const DEFAULT_ANALYSIS_MODEL: &str = "codellama:13b-instruct";

/// Default model for test-case generation
pub const DEFAULT_TESTGEN_MODEL: &str = "codellama:7b";

/// Default request timeout for one backend call
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Default number of backend attempts per call
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff unit; the wait before retry `n` is `2^n` units
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1000;

/// Wire dialect spoken by the inference backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Ollama `/api/chat`
    #[default]
    Ollama,
    /// OpenAI-compatible `/v1/chat/completions`
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub url: String,
    pub analysis_model: String,
    pub testgen_model: String,
    pub timeout_secs: u64,
    /// Environment variable holding the bearer key (OpenAI dialect only)
    pub api_key_env: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Ollama,
            url: DEFAULT_BACKEND_URL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            testgen_model: DEFAULT_TESTGEN_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECONDS,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_unit_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit_ms: DEFAULT_BACKOFF_UNIT_MS,
        }
    }
}

impl RetryConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub backend: BackendConfig,
    pub retry: RetryConfig,
}

impl JudgeConfig {
    /// Resolve configuration for a run.
    ///
    /// An explicit path must load cleanly. Without one, `codejudge.toml` in
    /// the working directory is used when present; if it is broken a
    /// warning is logged and defaults are used instead.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_or_default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        let config_path = Path::new(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            match Self::load(config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %config_path.display(), error = %e, "ignoring unreadable config file");
                }
            }
        }

        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| JudgeError::read_input(path, e))?;
        Self::from_toml_str(&content)
            .map_err(|e| JudgeError::config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `CODEJUDGE_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Some(url) = non_empty_var("CODEJUDGE_BACKEND_URL") {
            self.backend.url = url;
        }

        if let Some(model) = non_empty_var("CODEJUDGE_MODEL") {
            self.backend.analysis_model = model;
        }

        if let Some(model) = non_empty_var("CODEJUDGE_TESTGEN_MODEL") {
            self.backend.testgen_model = model;
        }

        if let Some(retries) = non_empty_var("CODEJUDGE_RETRIES") {
            if let Ok(count) = retries.parse::<u32>() {
                self.retry.max_attempts = count.clamp(1, 10);
            }
        }

        if let Some(timeout) = non_empty_var("CODEJUDGE_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                self.backend.timeout_secs = seconds.clamp(5, 3600);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(JudgeError::config("retry.max_attempts must be at least 1"));
        }
        if self.backend.url.trim().is_empty() {
            return Err(JudgeError::config("backend.url must not be empty"));
        }
        if self.backend.analysis_model.trim().is_empty() {
            return Err(JudgeError::config(
                "backend.analysis_model must not be empty",
            ));
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

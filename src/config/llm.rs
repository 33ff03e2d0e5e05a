use std::time::Duration;

use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_env, parse_optional_env};
use crate::error::ConfigError;
use crate::llm::{ModelConfig, RetryConfig};

/// Default model backend for new sessions.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "fake-react".to_string(),
            model: None,
            base_url: None,
            api_key: None,
            max_tokens: None,
            temperature: None,
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let defaults = RetryConfig::default();
        let timeout_secs: u64 =
            parse_optional_env("LLM_TIMEOUT_SECS", defaults.timeout().as_secs())?;
        let max_retries: u32 = parse_optional_env("LLM_MAX_RETRIES", defaults.max_retries())?;
        let backoff_ms: u64 =
            parse_optional_env("LLM_BACKOFF_MS", defaults.backoff().as_millis() as u64)?;

        let retry = RetryConfig::new(
            Duration::from_secs(timeout_secs),
            max_retries,
            Duration::from_millis(backoff_ms),
        )
        .map_err(|e| ConfigError::InvalidValue {
            key: if timeout_secs == 0 {
                "LLM_TIMEOUT_SECS".to_string()
            } else if backoff_ms == 0 {
                "LLM_BACKOFF_MS".to_string()
            } else {
                "LLM_MAX_RETRIES".to_string()
            },
            message: e.to_string(),
        })?;

        Ok(Self {
            provider: optional_env("LLM_PROVIDER")?.unwrap_or_else(|| "fake-react".to_string()),
            model: optional_env("LLM_MODEL")?,
            base_url: optional_env("LLM_BASE_URL")?,
            api_key: optional_env("LLM_API_KEY")?.map(SecretString::from),
            max_tokens: parse_env("LLM_MAX_TOKENS")?,
            temperature: parse_env("LLM_TEMPERATURE")?,
            retry,
        })
    }

    /// Model config for sessions created without an explicit one.
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            provider: self.provider.clone(),
            name: self.provider.clone(),
            model: self.model.clone().unwrap_or_default(),
            base_url: self.base_url.clone().unwrap_or_default(),
            api_key: self.api_key.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

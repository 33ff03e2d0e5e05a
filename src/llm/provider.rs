//! Model backend contract.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::LlmError;

/// Per-call generation options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerateOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// A text-in, text-out model backend.
///
/// The engine never looks past this contract: a prompt goes in, the raw
/// completion text comes out, or the call fails.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Name of the model this provider talks to.
    fn model_name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError>;
}

/// Model selection for a chat session.
///
/// Opaque to the engine; only the provider factory interprets it.
#[derive(Debug, Clone, Default)]
pub struct ModelConfig {
    /// Adapter kind, e.g. `openai-compatible`, `deepseek`, `fake-react`.
    pub provider: String,
    /// Display name of the configuration.
    pub name: String,
    /// Concrete model id sent to the backend.
    pub model: String,
    /// Base URL for HTTP backends. Empty means the provider default.
    pub base_url: String,
    /// API key, supplied at runtime and never serialized.
    pub api_key: Option<SecretString>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ModelConfig {
    /// Config for the given provider with everything else defaulted.
    pub fn for_provider(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    /// Generation options implied by this config.
    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

//! Model backends.
//!
//! - `openai-compatible` (also `openai`, `deepseek`): HTTP chat completions
//! - `fake-react` (also `fake`): deterministic offline model
//!
//! Every provider built by the factory is wrapped in a [`RetryProvider`].

mod fake;
mod openai_compatible;
mod provider;
mod retry;

use std::sync::Arc;

pub use fake::FakeReactModel;
pub use openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
pub use provider::{GenerateOptions, LlmProvider, ModelConfig};
pub use retry::{MAX_RETRIES_LIMIT, RetryConfig, RetryProvider, generate_with_retry};

use crate::error::LlmError;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";

/// Builds a provider for a session's model config.
pub trait LlmFactory: Send + Sync {
    fn create(&self, config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, LlmError>;
}

/// Factory backed by [`create_llm_provider`] and a shared retry policy.
#[derive(Debug, Clone, Default)]
pub struct DefaultLlmFactory {
    retry: RetryConfig,
}

impl DefaultLlmFactory {
    pub fn new(retry: RetryConfig) -> Self {
        Self { retry }
    }
}

impl LlmFactory for DefaultLlmFactory {
    fn create(&self, config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
        let inner = create_llm_provider(config)?;
        Ok(Arc::new(RetryProvider::new(inner, self.retry)))
    }
}

/// Create the bare provider named by `config.provider`.
pub fn create_llm_provider(config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let kind = config.provider.trim().to_lowercase().replace('_', "-");
    match kind.as_str() {
        "fake-react" | "fake" => Ok(Arc::new(FakeReactModel)),
        "openai-compatible" | "openai" | "deepseek" => {
            let (default_url, default_model) = if kind == "deepseek" {
                (DEEPSEEK_BASE_URL, DEEPSEEK_DEFAULT_MODEL)
            } else {
                (OPENAI_BASE_URL, "")
            };
            let base_url = if config.base_url.trim().is_empty() {
                default_url.to_string()
            } else {
                config.base_url.clone()
            };
            let model = if config.model.trim().is_empty() {
                default_model.to_string()
            } else {
                config.model.clone()
            };

            tracing::debug!(
                provider = %kind,
                model = %model,
                base_url = %base_url,
                "Creating LLM provider"
            );
            let provider = OpenAiCompatibleProvider::new(OpenAiCompatibleConfig {
                provider: kind.clone(),
                base_url,
                api_key: config.api_key.clone(),
                model,
            })?;
            Ok(Arc::new(provider))
        }
        _ => Err(LlmError::UnknownProvider(config.provider.clone())),
    }
}

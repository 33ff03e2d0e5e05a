//! OpenAI-compatible Chat Completions provider.
//!
//! Works against any `/v1/chat/completions` endpoint (OpenAI, DeepSeek,
//! vLLM, LiteLLM, local proxies). The whole prompt is sent as one user
//! message and the first choice's content is returned verbatim.
//!
//! Retries and per-attempt timeouts are applied by
//! [`RetryProvider`](crate::llm::RetryProvider), not here.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::llm::provider::{GenerateOptions, LlmProvider};

const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;
const LOG_TRUNCATE_BYTES: usize = 2000;

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Label used in errors and logs (`openai`, `deepseek`, ...).
    pub provider: String,
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
}

/// Provider over `/v1/chat/completions`.
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, LlmError> {
        if config.model.trim().is_empty() {
            return Err(LlmError::RequestFailed {
                provider: config.provider.clone(),
                reason: "model name is required".to_string(),
            });
        }

        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: config.provider.clone(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');

        if base.ends_with("/v1") {
            format!("{}/{}", base, path)
        } else {
            format!("{}/v1/{}", base, path)
        }
    }

    fn api_key(&self) -> String {
        self.config
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().to_string())
            .unwrap_or_else(|| "no-key".to_string())
    }

    fn provider(&self) -> String {
        self.config.provider.clone()
    }

    async fn send_request(
        &self,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let url = self.api_url("chat/completions");
        tracing::debug!(
            provider = %self.config.provider,
            "Sending chat completion request to {}",
            url
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key()))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: self.provider(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| LlmError::RequestFailed {
            provider: self.provider(),
            reason: format!("Failed to read response body: {e}"),
        })?;

        if response_text.len() > MAX_RESPONSE_BYTES {
            return Err(LlmError::RequestFailed {
                provider: self.provider(),
                reason: format!(
                    "Response too large: {} bytes (max {})",
                    response_text.len(),
                    MAX_RESPONSE_BYTES
                ),
            });
        }

        tracing::debug!(
            provider = %self.config.provider,
            status = %status,
            "Chat completion response: {}",
            truncate_for_log(&response_text)
        );

        if !status.is_success() {
            return Err(match status.as_u16() {
                401 => LlmError::AuthFailed {
                    provider: self.provider(),
                },
                429 => LlmError::RateLimited {
                    provider: self.provider(),
                },
                _ => LlmError::RequestFailed {
                    provider: self.provider(),
                    reason: format!("HTTP {}: {}", status, truncate_for_log(&response_text)),
                },
            });
        }

        serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
            provider: self.provider(),
            reason: format!("JSON parse error: {}", e),
        })
    }
}

fn truncate_for_log(text: &str) -> String {
    if text.len() <= LOG_TRUNCATE_BYTES {
        return text.to_string();
    }
    let mut end = LOG_TRUNCATE_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, {} bytes total]", &text[..end], text.len())
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![ChatCompletionMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = self.send_request(&request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: self.provider(),
                reason: "No choices in response".to_string(),
            })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> OpenAiCompatibleConfig {
        OpenAiCompatibleConfig {
            provider: "openai".to_string(),
            base_url: base_url.to_string(),
            api_key: None,
            model: "test-model".to_string(),
        }
    }

    #[test]
    fn test_api_url_without_v1_suffix() {
        let provider = OpenAiCompatibleProvider::new(config("http://127.0.0.1:8318")).unwrap();
        assert_eq!(
            provider.api_url("chat/completions"),
            "http://127.0.0.1:8318/v1/chat/completions"
        );
    }

    #[test]
    fn test_api_url_with_v1_suffix() {
        let provider = OpenAiCompatibleProvider::new(config("http://127.0.0.1:8318/v1/")).unwrap();
        assert_eq!(
            provider.api_url("/chat/completions"),
            "http://127.0.0.1:8318/v1/chat/completions"
        );
    }

    #[test]
    fn test_missing_model_rejected() {
        let mut cfg = config("http://localhost");
        cfg.model = " ".to_string();
        assert!(OpenAiCompatibleProvider::new(cfg).is_err());
    }

    #[test]
    fn test_api_key_placeholder_and_secret() {
        let provider = OpenAiCompatibleProvider::new(config("http://localhost")).unwrap();
        assert_eq!(provider.api_key(), "no-key");

        let mut cfg = config("http://localhost");
        cfg.api_key = Some(SecretString::from("sk-test"));
        let provider = OpenAiCompatibleProvider::new(cfg).unwrap();
        assert_eq!(provider.api_key(), "sk-test");
    }

    #[test]
    fn test_request_omits_unset_options() {
        let request = ChatCompletionRequest {
            model: "m",
            messages: vec![ChatCompletionMessage {
                role: "user",
                content: "hi",
            }],
            temperature: None,
            max_tokens: Some(64),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["max_tokens"], 64);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_parses_null_content() {
        let raw = concat!(
            r#"{"id":"x","choices":[{"message":{"role":"assistant","content":null},"#,
            r#""finish_reason":"stop"}]}"#
        );
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let text = "é".repeat(LOG_TRUNCATE_BYTES);
        let out = truncate_for_log(&text);
        assert!(out.contains("truncated"));
    }
}

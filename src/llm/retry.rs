//! Bounded, retrying model calls.
//!
//! Every attempt is wrapped in a timeout. Failed attempts are retried with
//! exponential backoff (`backoff * 2^attempt`) until `max_retries + 1`
//! attempts have been made.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::provider::{GenerateOptions, LlmProvider};

/// Upper bound on `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 100;

/// Timeout and retry policy for model calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl RetryConfig {
    /// Build a policy, rejecting a zero timeout, a zero backoff, or more than
    /// [`MAX_RETRIES_LIMIT`] retries.
    pub fn new(timeout: Duration, max_retries: u32, backoff: Duration) -> Result<Self, LlmError> {
        if timeout.is_zero() {
            return Err(LlmError::InvalidRetryConfig(
                "timeout must be positive".to_string(),
            ));
        }
        if backoff.is_zero() {
            return Err(LlmError::InvalidRetryConfig(
                "backoff must be positive".to_string(),
            ));
        }
        if max_retries > MAX_RETRIES_LIMIT {
            return Err(LlmError::InvalidRetryConfig(format!(
                "max_retries must be at most {MAX_RETRIES_LIMIT}"
            )));
        }
        Ok(Self {
            timeout,
            max_retries,
            backoff,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryConfig {
    /// 60 s per attempt, 2 retries, 500 ms base backoff.
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Call `provider` under `config`, retrying on any failure.
pub async fn generate_with_retry(
    provider: &dyn LlmProvider,
    prompt: &str,
    options: &GenerateOptions,
    config: &RetryConfig,
) -> Result<String, LlmError> {
    let attempts = config.max_retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        let result = match tokio::time::timeout(config.timeout, provider.generate(prompt, options))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                provider: provider.model_name().to_string(),
                timeout: config.timeout,
            }),
        };

        let err = match result {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };

        if attempt + 1 >= attempts {
            tracing::warn!(
                model = %provider.model_name(),
                attempts,
                error = %err,
                "Model call failed permanently"
            );
            return Err(LlmError::RetriesExhausted {
                provider: provider.model_name().to_string(),
                attempts,
                last_error: Box::new(err),
            });
        }

        let delay = config.delay_for(attempt);
        tracing::warn!(
            model = %provider.model_name(),
            "Model call failed (attempt {}/{}), retrying in {:?}: {}",
            attempt + 1,
            attempts,
            delay,
            err
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Provider decorator that applies a [`RetryConfig`] to every call.
pub struct RetryProvider {
    inner: Arc<dyn LlmProvider>,
    config: RetryConfig,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl LlmProvider for RetryProvider {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError> {
        generate_with_retry(self.inner.as_ref(), prompt, options, &self.config).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::testing::ScriptedLlm;

    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig::new(Duration::from_secs(5), max_retries, Duration::from_millis(1)).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_settings() {
        assert!(RetryConfig::new(Duration::ZERO, 1, Duration::from_millis(1)).is_err());
        assert!(RetryConfig::new(Duration::from_secs(1), 1, Duration::ZERO).is_err());
        assert!(RetryConfig::new(Duration::from_secs(1), 0, Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn test_rejects_excessive_retries() {
        let backoff = Duration::from_millis(1);
        assert!(RetryConfig::new(Duration::from_secs(1), MAX_RETRIES_LIMIT, backoff).is_ok());
        assert!(matches!(
            RetryConfig::new(Duration::from_secs(1), MAX_RETRIES_LIMIT + 1, backoff),
            Err(LlmError::InvalidRetryConfig(_))
        ));
        assert!(matches!(
            RetryConfig::new(Duration::from_secs(1), u32::MAX, backoff),
            Err(LlmError::InvalidRetryConfig(_))
        ));
    }

    #[test]
    fn test_delay_doubles() {
        let config =
            RetryConfig::new(Duration::from_secs(1), 3, Duration::from_millis(500)).unwrap();
        assert_eq!(config.delay_for(0), Duration::from_millis(500));
        assert_eq!(config.delay_for(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_default_policy() {
        let config = RetryConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.max_retries(), 2);
        assert_eq!(config.backoff(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_retries_once_then_succeeds() {
        let llm = ScriptedLlm::new(["ok"]).failing_first(1);
        let out = generate_with_retry(&llm, "hi", &GenerateOptions::default(), &fast(1))
            .await
            .unwrap();
        assert_eq!(out, "ok");
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries_plus_one() {
        let llm = ScriptedLlm::new(["never"]);
        llm.set_failing(true);
        let err = generate_with_retry(&llm, "hi", &GenerateOptions::default(), &fast(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(llm.calls(), 3);
    }

    struct HangingProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for HangingProvider {
        fn model_name(&self) -> &str {
            "hanging"
        }

        async fn generate(&self, _: &str, _: &GenerateOptions) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let llm = HangingProvider {
            calls: AtomicU32::new(0),
        };
        let config =
            RetryConfig::new(Duration::from_millis(20), 1, Duration::from_millis(1)).unwrap();
        let err = generate_with_retry(&llm, "hi", &GenerateOptions::default(), &config)
            .await
            .unwrap_err();
        match err {
            LlmError::RetriesExhausted { last_error, .. } => {
                assert!(matches!(*last_error, LlmError::Timeout { .. }))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(llm.calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_retry_provider_wraps_calls() {
        let inner = Arc::new(ScriptedLlm::new(["done"]).failing_first(2));
        let provider = RetryProvider::new(inner.clone(), fast(2));
        let out = provider
            .generate("x", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(out, "done");
        assert_eq!(inner.calls(), 3);
        assert_eq!(provider.model_name(), "scripted");
    }
}

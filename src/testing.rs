//! Shared stubs for unit and integration tests.
//!
//! Provides:
//! - [`ScriptedLlm`]: an LLM provider that replays queued responses
//! - [`RecordingTool`]: a configurable tool that records its invocations
//! - [`FixedLlmFactory`]: an [`LlmFactory`] that always hands out one provider
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gatekeep::testing::{FixedLlmFactory, ScriptedLlm};
//!
//! let llm = Arc::new(ScriptedLlm::new(["Final Answer: ok"]));
//! let factory = FixedLlmFactory::new(llm.clone());
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::{GenerateOptions, LlmFactory, LlmProvider, ModelConfig};
use crate::tools::{Tool, ToolError, ToolOutput};

/// An LLM provider stub that returns scripted responses in order.
///
/// Once the script runs out the last response is repeated, so a single
/// response behaves like a fixed stub.
///
/// Supports:
/// - Call counting via [`calls()`](Self::calls)
/// - Prompt capture via [`prompts()`](Self::prompts)
/// - Runtime failure toggling via [`set_failing()`](Self::set_failing)
/// - Failing the first N calls via [`failing_first()`](Self::failing_first)
pub struct ScriptedLlm {
    model_name: String,
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    prompts: Mutex<Vec<String>>,
    call_count: AtomicU32,
    fail_first: AtomicU32,
    should_fail: AtomicBool,
}

impl ScriptedLlm {
    /// Create a stub that replays `responses`.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model_name: "scripted".to_string(),
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            last: Mutex::new(String::new()),
            prompts: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
            fail_first: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
        }
    }

    /// Fail the first `n` calls before serving the script.
    pub fn failing_first(self, n: u32) -> Self {
        self.fail_first.store(n, Ordering::Relaxed);
        self
    }

    /// Number of times `generate` was called, failures included.
    pub fn calls(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }

    /// Toggle whether calls should fail at runtime.
    pub fn set_failing(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    fn make_error(&self) -> LlmError {
        LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: "server error".to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String, LlmError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_string());

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(self.make_error());
        }
        let pending_failures = self.fail_first.load(Ordering::Relaxed);
        if pending_failures > 0 {
            self.fail_first.store(pending_failures - 1, Ordering::Relaxed);
            return Err(self.make_error());
        }

        let mut last = self.last.lock().expect("last lock");
        if let Some(next) = self.responses.lock().expect("responses lock").pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}

/// Factory that returns the same provider for every model config.
pub struct FixedLlmFactory {
    provider: Arc<dyn LlmProvider>,
}

impl FixedLlmFactory {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

impl LlmFactory for FixedLlmFactory {
    fn create(&self, _config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
        Ok(Arc::clone(&self.provider))
    }
}

/// A tool stub that records calls and returns a configurable result.
pub struct RecordingTool {
    name: String,
    description: String,
    schema: serde_json::Value,
    result: serde_json::Value,
    failure: Option<String>,
    call_count: AtomicU32,
    last_params: Mutex<Option<serde_json::Value>>,
}

impl RecordingTool {
    /// A tool named `name` that returns `{"status": "ok"}`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("Test tool {name}"),
            name,
            schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
            result: serde_json::json!({ "status": "ok" }),
            failure: None,
            call_count: AtomicU32::new(0),
            last_params: Mutex::new(None),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Return `result` from every call.
    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = result;
        self
    }

    /// Fail every call with `ToolError::ExecutionFailed(reason)`.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Number of times `execute` was called.
    pub fn calls(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Parameters of the most recent call.
    pub fn last_params(&self) -> Option<serde_json::Value> {
        self.last_params.lock().expect("params lock").clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.schema.clone()
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_params.lock().expect("params lock") = Some(params);

        if let Some(reason) = &self.failure {
            return Err(ToolError::ExecutionFailed(reason.clone()));
        }
        Ok(ToolOutput::success(
            self.result.clone(),
            Duration::from_millis(1),
        ))
    }
}

//! The think -> decide -> act -> observe loop.
//!
//! Each iteration renders the prompt (system template, tool metadata, user
//! input and the full scratchpad), asks the model once, and acts on the
//! parsed decision. The loop ends on a final answer, on output it cannot
//! act on, when a gated tool call needs approval, or when the iteration
//! budget runs out.
//!
//! The loop holds no state between runs: everything needed to continue is
//! in the scratchpad the caller passes in.

use std::sync::Arc;
use std::time::Instant;

use crate::agent::decision::{Decision, parse_decision};
use crate::agent::prompt::{ToolsMetadata, render_react_prompt};
use crate::agent::scratchpad::{Scratchpad, render_observation};
use crate::error::LlmError;
use crate::llm::{GenerateOptions, LlmProvider};
use crate::tools::{Tool, ToolError, ToolOutput, ToolRegistry, ToolSchema};

/// Reply surfaced when the loop runs out of iterations.
pub const EXHAUSTED_FALLBACK: &str =
    "I'm sorry, I couldn't complete the task within the maximum number of steps.";

/// Why a loop run ended without suspending.
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// The model gave its final answer.
    Final { answer: String },
    /// The model output could not be parsed.
    Invalid { reason: String },
    /// The model asked for a tool that is not registered.
    ToolNotFound { tool_name: String },
    /// The iteration budget ran out.
    Exhausted { iterations: usize },
}

impl Termination {
    /// Human-readable reason for a non-final ending, `None` for `Final`.
    pub fn error(&self) -> Option<String> {
        match self {
            Self::Final { .. } => None,
            Self::Invalid { reason } => Some(reason.clone()),
            Self::ToolNotFound { tool_name } => Some(format!("tool not found: {tool_name}")),
            Self::Exhausted { .. } => Some("agent exceeded max iterations".to_string()),
        }
    }
}

/// A tool call held back for human approval.
#[derive(Debug, Clone, PartialEq)]
pub struct GatedCall {
    pub tool: ToolSchema,
    pub arguments: serde_json::Value,
}

/// Where the loop is within a run.
#[derive(Debug)]
pub enum LoopState {
    /// About to render a prompt and call the model.
    Thinking,
    /// Acting on the decision parsed from the latest model output.
    Deciding(Decision),
    /// A gated tool call was chosen; the run suspends.
    AwaitingApproval(GatedCall),
    Terminated(Termination),
}

/// How a loop run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    AwaitingApproval(GatedCall),
    Terminated(Termination),
}

/// Runs the ReAct loop against one model and the shared tool registry.
pub struct ReactLoop {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
    options: GenerateOptions,
}

impl ReactLoop {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, max_iterations: usize) -> Self {
        Self {
            llm,
            tools,
            max_iterations,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Run until the loop terminates or suspends for approval.
    ///
    /// Every model output and observation is appended to `scratchpad`, which
    /// still holds the progress made so far if the model call fails.
    pub async fn run(
        &self,
        user_input: &str,
        scratchpad: &mut Scratchpad,
        require_approval: bool,
    ) -> Result<LoopOutcome, LlmError> {
        let metadata = ToolsMetadata::from_schemas(&self.tools.schemas().await);
        let mut iterations = 0;
        let mut state = LoopState::Thinking;

        loop {
            state = match state {
                LoopState::Thinking if iterations >= self.max_iterations => {
                    LoopState::Terminated(Termination::Exhausted { iterations })
                }
                LoopState::Thinking => {
                    iterations += 1;
                    tracing::debug!(
                        model = %self.llm.model_name(),
                        iteration = iterations,
                        max_iterations = self.max_iterations,
                        "ReAct iteration"
                    );
                    let prompt = render_react_prompt(user_input, scratchpad, &metadata);
                    let raw = self.llm.generate(&prompt, &self.options).await?;
                    scratchpad.push_model_output(&raw);
                    LoopState::Deciding(parse_decision(&raw))
                }
                LoopState::Deciding(Decision::Final { text }) => {
                    LoopState::Terminated(Termination::Final { answer: text })
                }
                LoopState::Deciding(Decision::Invalid { reason }) => {
                    LoopState::Terminated(Termination::Invalid { reason })
                }
                LoopState::Deciding(Decision::ToolCall {
                    tool_name,
                    arguments,
                }) => match self.tools.get(&tool_name).await {
                    None => LoopState::Terminated(Termination::ToolNotFound { tool_name }),
                    Some(tool) if require_approval => LoopState::AwaitingApproval(GatedCall {
                        tool: tool.schema(),
                        arguments,
                    }),
                    Some(tool) => {
                        let result = run_tool(tool.as_ref(), arguments).await;
                        scratchpad.push_observation(&tool_observation(&result));
                        LoopState::Thinking
                    }
                },
                LoopState::AwaitingApproval(call) => {
                    tracing::info!(
                        tool = %call.tool.name,
                        iterations,
                        "Tool call requires approval, suspending"
                    );
                    return Ok(LoopOutcome::AwaitingApproval(call));
                }
                LoopState::Terminated(termination) => {
                    match &termination {
                        Termination::Final { .. } => {
                            tracing::info!(iterations, "ReAct loop finished")
                        }
                        other => tracing::warn!(
                            iterations,
                            reason = %other.error().unwrap_or_default(),
                            "ReAct loop terminated without an answer"
                        ),
                    }
                    return Ok(LoopOutcome::Terminated(termination));
                }
            };
        }
    }
}

/// Execute a tool, logging timing and outcome.
pub async fn run_tool(
    tool: &dyn Tool,
    params: serde_json::Value,
) -> Result<ToolOutput, ToolError> {
    tracing::debug!(tool = %tool.name(), params = %params, "Tool call started");

    let start = Instant::now();
    let result = tool.execute(params).await;
    let elapsed = start.elapsed();

    match &result {
        Ok(output) => tracing::debug!(
            tool = %tool.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            ok = output.is_ok(),
            "Tool call succeeded"
        ),
        Err(e) => tracing::debug!(
            tool = %tool.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            error = %e,
            "Tool call failed"
        ),
    }

    result
}

/// Observation text for a tool result. Failures are fed back to the model
/// rather than ending the loop.
pub fn tool_observation(result: &Result<ToolOutput, ToolError>) -> String {
    match result {
        Ok(output) => render_observation(&output.result),
        Err(e) => format!("Error executing tool: {e}"),
    }
}

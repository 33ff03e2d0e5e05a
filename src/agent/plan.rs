//! Plan-and-execute: one planning call, then straight-line tool execution.
//!
//! The model is asked once for a JSON plan. Steps then run in order with no
//! further model involvement, stopping at the first step that is not ok.
//! Already executed steps are never rolled back; the report lists exactly
//! what ran.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent::prompt::render_plan_prompt;
use crate::agent::react::run_tool;
use crate::error::PlanError;
use crate::llm::{GenerateOptions, LlmProvider};
use crate::tools::{ToolRegistry, is_ok_result};

/// One tool invocation in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub name: Option<String>,
    pub tool: String,
    pub args: serde_json::Value,
}

/// Result of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// 1-based position in the plan.
    pub index: usize,
    pub tool: String,
    pub name: Option<String>,
    pub args: serde_json::Value,
    pub ok: bool,
    pub result: serde_json::Value,
}

/// Everything a plan run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub user_input: String,
    pub steps: Vec<StepOutcome>,
}

impl PlanReport {
    /// Whether every step ran ok.
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.ok)
    }
}

/// Parse the planner output into steps.
///
/// The JSON object is taken from the first `{` to the last `}`. The plan is
/// rejected as a whole if `steps` is missing or empty, or if any step is
/// malformed.
pub fn parse_plan(raw: &str) -> Result<Vec<PlanStep>, PlanError> {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(PlanError::InvalidPlan(
            "no JSON object in planner output".to_string(),
        ));
    };
    if end <= start {
        return Err(PlanError::InvalidPlan(
            "no JSON object in planner output".to_string(),
        ));
    }

    let value: serde_json::Value = serde_json::from_str(&raw[start..=end])
        .map_err(|e| PlanError::InvalidPlan(format!("plan JSON failed to parse: {e}")))?;

    let steps = match value.get("steps").and_then(|s| s.as_array()) {
        Some(steps) if !steps.is_empty() => steps,
        _ => return Err(PlanError::InvalidPlan("plan has no steps".to_string())),
    };

    steps
        .iter()
        .enumerate()
        .map(|(i, step)| parse_step(i + 1, step))
        .collect()
}

fn parse_step(index: usize, step: &serde_json::Value) -> Result<PlanStep, PlanError> {
    let Some(obj) = step.as_object() else {
        return Err(PlanError::InvalidPlan(format!("step {index} is not an object")));
    };

    let tool = match obj.get("tool").and_then(|t| t.as_str()) {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => {
            return Err(PlanError::InvalidPlan(format!(
                "step {index}: tool must be a non-empty string"
            )));
        }
    };

    let args = match obj.get("args") {
        None | Some(serde_json::Value::Null) => serde_json::json!({}),
        Some(a) if a.is_object() => a.clone(),
        Some(_) => {
            return Err(PlanError::InvalidPlan(format!(
                "step {index}: args must be an object"
            )));
        }
    };

    let name = match obj.get("name") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(n)) => Some(n.clone()),
        Some(_) => {
            return Err(PlanError::InvalidPlan(format!(
                "step {index}: name must be a string"
            )));
        }
    };

    Ok(PlanStep { name, tool, args })
}

/// Runs plan-and-execute against one model and the shared tool registry.
pub struct PlanExecutor {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    options: GenerateOptions,
}

impl PlanExecutor {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            tools,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Plan with one model call, then execute at most `max_steps` steps.
    pub async fn run(&self, user_input: &str, max_steps: usize) -> Result<PlanReport, PlanError> {
        if user_input.trim().is_empty() {
            return Err(PlanError::InvalidInput(
                "user_input must not be empty".to_string(),
            ));
        }
        if max_steps == 0 {
            return Err(PlanError::InvalidInput(
                "max_steps must be a positive integer".to_string(),
            ));
        }

        let prompt = render_plan_prompt(user_input, &self.tools.schemas().await);
        let raw = self.llm.generate(&prompt, &self.options).await?;
        let steps = parse_plan(&raw)?;
        tracing::info!(steps = steps.len(), max_steps, "Plan received");

        Ok(self.execute(user_input, steps, max_steps).await)
    }

    /// Execute parsed steps in order, halting at the first failure.
    pub async fn execute(
        &self,
        user_input: &str,
        steps: Vec<PlanStep>,
        max_steps: usize,
    ) -> PlanReport {
        let mut outcomes = Vec::new();

        for (i, step) in steps.into_iter().take(max_steps).enumerate() {
            let index = i + 1;
            let (ok, result) = match self.tools.get(&step.tool).await {
                None => (
                    false,
                    serde_json::json!({ "error": format!("Tool '{}' not found.", step.tool) }),
                ),
                Some(tool) => match run_tool(tool.as_ref(), step.args.clone()).await {
                    Ok(output) => (is_ok_result(&output.result), output.result),
                    Err(e) => (false, serde_json::json!({ "error": e.to_string() })),
                },
            };

            if !ok {
                tracing::warn!(step = index, tool = %step.tool, "Plan step failed, halting");
            }
            outcomes.push(StepOutcome {
                index,
                tool: step.tool,
                name: step.name,
                args: step.args,
                ok,
                result,
            });
            if !ok {
                break;
            }
        }

        PlanReport {
            user_input: user_input.to_string(),
            steps: outcomes,
        }
    }
}

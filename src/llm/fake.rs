//! Deterministic offline model for demos and tests.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::agent::prompt::{PLANNER_HEADER, QUESTION_PREFIX};
use crate::error::LlmError;
use crate::llm::provider::{GenerateOptions, LlmProvider};

static WORKSPACE_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"WORKSPACE_DIR\s*=\s*([^\n]+)").expect("static regex"));

/// Scripted model that walks one ReAct round trip.
///
/// Until an observation shows up after the question it asks for a
/// `batch-file-search` for `TODO` in `.txt` files under `WORKSPACE_DIR=<dir>`
/// (or `.`), then answers `Final Answer: ok`. Planner prompts get a one-step
/// plan doing the same search.
#[derive(Debug, Default)]
pub struct FakeReactModel;

impl FakeReactModel {
    fn search_args(prompt: &str) -> serde_json::Value {
        let search_path = WORKSPACE_DIR
            .captures(prompt)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .unwrap_or(".");
        serde_json::json!({
            "search_path": search_path,
            "keyword": "TODO",
            "is_regex": false,
            "file_filter": ".txt",
            "case_sensitive": false,
        })
    }
}

#[async_trait]
impl LlmProvider for FakeReactModel {
    fn model_name(&self) -> &str {
        "fake-react"
    }

    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String, LlmError> {
        if prompt.contains(PLANNER_HEADER) {
            let plan = serde_json::json!({
                "steps": [{
                    "name": "search workspace",
                    "tool": "batch-file-search",
                    "args": Self::search_args(prompt),
                }]
            });
            return Ok(plan.to_string());
        }

        let scratch = prompt
            .rfind(QUESTION_PREFIX)
            .map(|idx| &prompt[idx..])
            .unwrap_or(prompt);
        if scratch.contains("Observation:") {
            return Ok("Thought: I have the search results.\nFinal Answer: ok".to_string());
        }

        Ok(format!(
            "Thought: I should search the workspace first.\n\
             Action: batch-file-search\nAction Input: {}",
            Self::search_args(prompt)
        ))
    }
}

//! Prompt templates for the ReAct loop and the planner.

use crate::agent::scratchpad::Scratchpad;
use crate::tools::ToolSchema;

/// Prefix of the line carrying the user's request in a ReAct prompt.
/// Everything after it is the live transcript.
pub const QUESTION_PREFIX: &str = "Question: ";

/// First line of every planner prompt.
pub const PLANNER_HEADER: &str =
    "You are a planner that turns a request into a sequence of tool calls.";

/// Tool descriptions and names as rendered into a ReAct prompt.
///
/// Built once per loop run; the tool set does not change mid-run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolsMetadata {
    pub description: String,
    pub names: String,
}

impl ToolsMetadata {
    pub fn from_schemas(schemas: &[ToolSchema]) -> Self {
        let description = schemas
            .iter()
            .map(|s| {
                format!(
                    "{}: {}\n   Parameters: {}",
                    s.name, s.description, s.parameters
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let names = schemas
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self { description, names }
    }
}

/// Render the ReAct prompt for one iteration.
pub fn render_react_prompt(
    user_input: &str,
    scratchpad: &Scratchpad,
    tools: &ToolsMetadata,
) -> String {
    format!(
        "You are a helpful assistant that solves problems in a Thought / Action / Observation cycle.

## Principles
1. Act precisely: only use the tools listed below and pass arguments as a JSON object.
2. Reason before acting: state the purpose of each action and adapt to every Observation.
3. Be honest: if the task cannot be solved, say so; the final answer must be complete.

## Tools
{tools}

## Format
Thought: analyse the situation and decide the next step.
Action: one of [{names}]
Action Input: {{\"parameter\": \"value\"}}
Observation: the tool result.
... (repeat as needed)
Thought: the task is done or cannot continue.
Final Answer: the reply to the user.

## Begin
{QUESTION_PREFIX}{user_input}
{scratchpad}",
        tools = tools.description,
        names = tools.names,
    )
}

/// Render the planner prompt, ending with the JSON-only output contract.
pub fn render_plan_prompt(user_input: &str, schemas: &[ToolSchema]) -> String {
    let skills = serde_json::to_string(schemas).unwrap_or_else(|_| "[]".to_string());
    format!(
        "{PLANNER_HEADER}

## Available tools
{skills}

## Request
{user_input}

Output JSON only, with no other text. Use this shape:
{{
  \"steps\": [
    {{
      \"name\": \"step name\",
      \"tool\": \"tool-name\",
      \"args\": {{\"key\": \"value\"}}
    }}
  ]
}}
"
    )
}

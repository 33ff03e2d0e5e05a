//! Append-only ReAct transcript.

use serde::{Deserialize, Serialize};

/// The reasoning transcript replayed into every prompt.
///
/// Holds each raw model output followed by the `Observation:` line that
/// answered it. Only appends are possible, and the whole text is rendered
/// into the next prompt as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scratchpad(String);

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw model output.
    pub fn push_model_output(&mut self, raw: &str) {
        self.0.push_str(raw);
        self.0.push('\n');
    }

    /// Append an `Observation:` line.
    pub fn push_observation(&mut self, observation: &str) {
        self.0.push_str("Observation: ");
        self.0.push_str(observation);
        self.0.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Scratchpad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render a tool result for an observation line: strings verbatim, anything
/// else as compact JSON.
pub fn render_observation(result: &serde_json::Value) -> String {
    match result {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

//! Turning free-form model output into a structured decision.
//!
//! The model is asked to answer in the ReAct text format:
//!
//! ```text
//! Thought: ...
//! Action: tool-name
//! Action Input: {"key": "value"}
//! ```
//!
//! or to finish with `Final Answer: ...`. Parsing never fails; anything that
//! cannot be understood becomes [`Decision::Invalid`] with a reason.

use std::sync::LazyLock;

use regex::Regex;

const FINAL_ANSWER_MARKER: &str = "Final Answer:";

static ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action:\s*([^\n]+)").expect("static regex"));
static ACTION_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Action Input:\s*(.+)").expect("static regex"));

/// What the model decided to do in one iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The model produced its answer.
    Final { text: String },
    /// The model wants to call a tool. `arguments` is always a JSON object.
    ToolCall {
        tool_name: String,
        arguments: serde_json::Value,
    },
    /// The output could not be understood.
    Invalid { reason: String },
}

impl Decision {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Parse one raw model output.
///
/// A `Final Answer:` anywhere wins over an action, and when the marker
/// appears more than once the text after the last occurrence is the answer.
/// Otherwise the first `Action:` line names the tool and everything after the
/// first `Action Input:` is read as a JSON object, tolerating code fences and
/// surrounding prose.
pub fn parse_decision(raw: &str) -> Decision {
    if let Some(idx) = raw.rfind(FINAL_ANSWER_MARKER) {
        let text = raw[idx + FINAL_ANSWER_MARKER.len()..].trim();
        return Decision::Final {
            text: text.to_string(),
        };
    }

    let (Some(action), Some(input)) = (ACTION.captures(raw), ACTION_INPUT.captures(raw)) else {
        return Decision::invalid("could not find Action / Action Input in model output");
    };

    let tool_name = action[1].trim().to_string();
    if tool_name.is_empty() {
        return Decision::invalid("Action names no tool");
    }

    let mut input = input[1].trim().trim_matches('`');
    if let Some(rest) = input.strip_prefix("json") {
        input = rest;
    }

    let (Some(start), Some(end)) = (input.find('{'), input.rfind('}')) else {
        return Decision::invalid("Action Input must be a JSON object");
    };
    if end < start {
        return Decision::invalid("Action Input must be a JSON object");
    }

    match serde_json::from_str::<serde_json::Value>(&input[start..=end]) {
        Ok(arguments) if arguments.is_object() => Decision::ToolCall {
            tool_name,
            arguments,
        },
        Ok(_) => Decision::invalid("Action Input must be a JSON object"),
        Err(e) => Decision::invalid(format!("failed to parse Action Input JSON: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn tool_call(name: &str, arguments: serde_json::Value) -> Decision {
        Decision::ToolCall {
            tool_name: name.to_string(),
            arguments,
        }
    }

    #[test]
    fn test_final_answer() {
        assert_eq!(
            parse_decision("Thought: done\nFinal Answer:  42 \n"),
            Decision::Final {
                text: "42".to_string()
            }
        );
    }

    #[test]
    fn test_last_final_answer_wins() {
        let raw = "Final Answer: draft\nThought: let me fix that\nFinal Answer: real";
        assert_eq!(
            parse_decision(raw),
            Decision::Final {
                text: "real".to_string()
            }
        );
    }

    #[test]
    fn test_final_answer_beats_action() {
        let raw = "Action: echo\nAction Input: {\"message\": \"x\"}\nFinal Answer: skip";
        assert!(matches!(parse_decision(raw), Decision::Final { .. }));
    }

    #[test]
    fn test_plain_action() {
        let raw =
            "Thought: search\nAction: batch-file-search\nAction Input: {\"keyword\": \"TODO\"}";
        assert_eq!(
            parse_decision(raw),
            tool_call("batch-file-search", json!({"keyword": "TODO"}))
        );
    }

    #[test]
    fn test_fenced_json_input() {
        let raw = "Action: echo\nAction Input: ```json\n{\"message\": \"hi\"}\n```";
        assert_eq!(parse_decision(raw), tool_call("echo", json!({"message": "hi"})));
    }

    #[test]
    fn test_backtick_wrapped_input() {
        let raw = "Action: echo \nAction Input: `{\"message\": \"hi\"}`";
        assert_eq!(parse_decision(raw), tool_call("echo", json!({"message": "hi"})));
    }

    #[test]
    fn test_input_with_trailing_prose_and_nested_braces() {
        let raw = "Action: echo\nAction Input: here you go {\"a\": {\"b\": 1}} hope it helps\n";
        assert_eq!(parse_decision(raw), tool_call("echo", json!({"a": {"b": 1}})));
    }

    #[test]
    fn test_first_action_line_is_used() {
        let raw = "Action: first\nAction Input: {}\nAction: second";
        assert_eq!(parse_decision(raw), tool_call("first", json!({})));
    }

    #[test]
    fn test_missing_markers() {
        for raw in ["just chatting", "Action: echo", "Action Input: {}"] {
            let Decision::Invalid { reason } = parse_decision(raw) else {
                panic!("expected invalid for {raw:?}");
            };
            assert!(!reason.is_empty());
        }
    }

    #[test]
    fn test_input_without_braces() {
        assert_eq!(
            parse_decision("Action: echo\nAction Input: hello"),
            Decision::Invalid {
                reason: "Action Input must be a JSON object".to_string()
            }
        );
        assert!(matches!(
            parse_decision("Action: echo\nAction Input: } oops {"),
            Decision::Invalid { .. }
        ));
    }

    #[test]
    fn test_malformed_json_reports_serde_error() {
        let Decision::Invalid { reason } = parse_decision("Action: echo\nAction Input: {\"a\": }")
        else {
            panic!("expected invalid");
        };
        assert!(reason.starts_with("failed to parse Action Input JSON"));
    }
}

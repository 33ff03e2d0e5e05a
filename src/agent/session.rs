//! Chat session model and the approval state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::scratchpad::Scratchpad;
use crate::llm::ModelConfig;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        };
        write!(f, "{}", s)
    }
}

/// A message in a session's visible conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Which orchestration strategy a session runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Iterative think/act/observe loop with optional approval gating.
    #[default]
    React,
    /// One upfront plan, executed without further model calls.
    PlanAndExecute,
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::React => "react",
            Self::PlanAndExecute => "plan_and_execute",
        };
        write!(f, "{}", s)
    }
}

/// The tool call a suspended loop is waiting on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingToolCall {
    pub approval_id: Uuid,
    pub tool_name: String,
    pub tool_args: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Status of a tool approval.
///
/// ```text
/// Pending -> Approved
///         -> Denied
/// ```
///
/// Both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
}

impl ApprovalStatus {
    /// Check if a transition is allowed.
    pub fn can_transition_to(&self, target: ApprovalStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Denied)
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        };
        write!(f, "{}", s)
    }
}

/// A human decision on a pending tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Deny,
}

impl ApprovalDecision {
    /// The status this decision moves a pending approval to.
    pub fn status(&self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Deny => ApprovalStatus::Denied,
        }
    }
}

/// Audit record of one gated tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolApproval {
    pub id: Uuid,
    pub session_id: Uuid,
    pub tool_name: String,
    pub tool_args: serde_json::Value,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub decision_reason: String,
}

/// State of a session, derived from whether a tool call is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    PendingApproval,
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Completed,
    ToolApprovalRequired,
    InvalidDecision,
}

/// What the caller needs to show a human to approve a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub approval_id: Uuid,
    pub tool_name: String,
    pub tool_description: String,
    pub tool_parameters: serde_json::Value,
    pub tool_args: serde_json::Value,
}

/// Result of `send_message` / `resolve_approval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: Uuid,
    pub status: ReplyStatus,
    /// Final answer, set when `status` is `Completed`.
    #[serde(default)]
    pub assistant: String,
    /// Set when `status` is `ToolApprovalRequired`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallRequest>,
    /// Reason, set when `status` is `InvalidDecision`.
    #[serde(default)]
    pub error: String,
}

impl ChatReply {
    pub fn completed(session_id: Uuid, assistant: impl Into<String>) -> Self {
        Self {
            session_id,
            status: ReplyStatus::Completed,
            assistant: assistant.into(),
            tool_call: None,
            error: String::new(),
        }
    }

    pub fn approval_required(session_id: Uuid, tool_call: ToolCallRequest) -> Self {
        Self {
            session_id,
            status: ReplyStatus::ToolApprovalRequired,
            assistant: String::new(),
            tool_call: Some(tool_call),
            error: String::new(),
        }
    }

    pub fn invalid(session_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            session_id,
            status: ReplyStatus::InvalidDecision,
            assistant: String::new(),
            tool_call: None,
            error: error.into(),
        }
    }
}

/// A conversation with its reasoning transcript and approval state.
///
/// `pending_tool_call` is the single source of truth for the session state:
/// a session is in [`SessionState::PendingApproval`] exactly when it is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Never serialized; API keys stay in memory.
    #[serde(skip)]
    pub model_config: ModelConfig,
    pub workflow: WorkflowKind,
    pub require_tool_approval: bool,
    pub messages: Vec<ChatMessage>,
    pub scratchpad: Scratchpad,
    pub pending_tool_call: Option<PendingToolCall>,
    /// The reply of the last finished turn.
    pub last_reply: Option<ChatReply>,
}

impl ChatSession {
    pub fn new(
        model_config: ModelConfig,
        workflow: WorkflowKind,
        require_tool_approval: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            model_config,
            workflow,
            require_tool_approval,
            messages: Vec::new(),
            scratchpad: Scratchpad::new(),
            pending_tool_call: None,
            last_reply: None,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.pending_tool_call.is_some() {
            SessionState::PendingApproval
        } else {
            SessionState::Idle
        }
    }

    /// Content of the most recent user message.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_transitions() {
        use ApprovalStatus::*;

        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Denied));
        assert!(!Approved.can_transition_to(Denied));
        assert!(!Denied.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Pending));

        assert!(!Pending.is_terminal());
        assert!(Approved.is_terminal());
        assert!(Denied.is_terminal());
    }

    #[test]
    fn test_state_follows_pending_call() {
        let mut session = ChatSession::new(ModelConfig::default(), WorkflowKind::React, true);
        assert_eq!(session.state(), SessionState::Idle);

        session.pending_tool_call = Some(PendingToolCall {
            approval_id: Uuid::new_v4(),
            tool_name: "echo".to_string(),
            tool_args: serde_json::json!({}),
            created_at: Utc::now(),
        });
        assert_eq!(session.state(), SessionState::PendingApproval);
    }

    #[test]
    fn test_last_user_message_skips_assistant() {
        let mut session = ChatSession::new(ModelConfig::default(), WorkflowKind::React, true);
        assert_eq!(session.last_user_message(), None);

        session.messages.push(ChatMessage::new(Role::User, "first"));
        session.messages.push(ChatMessage::new(Role::User, "second"));
        session
            .messages
            .push(ChatMessage::new(Role::Assistant, "answer"));
        assert_eq!(session.last_user_message(), Some("second"));
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_value(ReplyStatus::ToolApprovalRequired).unwrap(),
            "tool_approval_required"
        );
        assert_eq!(
            serde_json::to_value(WorkflowKind::PlanAndExecute).unwrap(),
            "plan_and_execute"
        );
        assert_eq!(ApprovalDecision::Deny.status(), ApprovalStatus::Denied);
    }

    #[test]
    fn test_session_serialization_skips_model_config() {
        let mut config = ModelConfig::for_provider("openai");
        config.api_key = Some(secrecy::SecretString::from("sk-secret"));
        let session = ChatSession::new(config, WorkflowKind::React, false);

        let json = serde_json::to_string(&session).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(!json.contains("model_config"));
    }
}

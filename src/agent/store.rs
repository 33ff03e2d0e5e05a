//! Session and approval persistence.
//!
//! The engine only mutates sessions through [`SessionStore`]; every
//! operation is atomic with respect to a single session.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::agent::scratchpad::Scratchpad;
use crate::agent::session::{
    ApprovalDecision, ApprovalStatus, ChatMessage, ChatReply, ChatSession, PendingToolCall, Role,
    ToolApproval, WorkflowKind,
};
use crate::error::SessionError;
use crate::llm::ModelConfig;

/// Warn when session count exceeds this threshold.
const SESSION_COUNT_WARNING_THRESHOLD: usize = 1000;

/// Outcome of resolving an approval.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The approval record after the call.
    pub approval: ToolApproval,
    /// `false` when the approval had already been resolved and nothing changed.
    pub newly_resolved: bool,
}

/// Backend-agnostic store for chat sessions and their approvals.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(
        &self,
        model_config: ModelConfig,
        workflow: WorkflowKind,
        require_tool_approval: bool,
    ) -> Result<ChatSession, SessionError>;

    /// Snapshot of a session.
    async fn get_session(&self, session_id: Uuid) -> Result<ChatSession, SessionError>;

    /// Append a message. User messages are rejected while an approval is pending.
    async fn add_message(
        &self,
        session_id: Uuid,
        role: Role,
        content: &str,
    ) -> Result<(), SessionError>;

    async fn update_scratchpad(
        &self,
        session_id: Uuid,
        scratchpad: Scratchpad,
    ) -> Result<(), SessionError>;

    /// Create a pending approval and mark the session as waiting on it.
    /// Fails with `Conflict` if the session already waits on one.
    async fn create_approval(
        &self,
        session_id: Uuid,
        tool_name: &str,
        tool_args: serde_json::Value,
    ) -> Result<ToolApproval, SessionError>;

    /// Resolve an approval and clear the session's pending call.
    /// Resolving an already-resolved approval returns it unchanged.
    async fn resolve_approval(
        &self,
        approval_id: Uuid,
        decision: ApprovalDecision,
        reason: &str,
    ) -> Result<Resolution, SessionError>;

    async fn get_approval(&self, approval_id: Uuid) -> Result<ToolApproval, SessionError>;

    /// Approvals of a session, newest first, optionally filtered by status.
    async fn list_approvals(
        &self,
        session_id: Uuid,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<ToolApproval>, SessionError>;

    /// Remember the reply of the last finished turn.
    async fn record_reply(&self, session_id: Uuid, reply: ChatReply) -> Result<(), SessionError>;
}

struct SessionEntry {
    session: ChatSession,
    approvals: Vec<ToolApproval>,
}

/// In-process [`SessionStore`].
///
/// Each session and its approvals live behind one mutex, so a session's
/// pending call and its approval records always change together.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<SessionEntry>>>>,
    approval_index: RwLock<HashMap<Uuid, Uuid>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            approval_index: RwLock::new(HashMap::new()),
        }
    }

    async fn entry(&self, session_id: Uuid) -> Result<Arc<Mutex<SessionEntry>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(SessionError::SessionNotFound(session_id))
    }

    async fn entry_for_approval(
        &self,
        approval_id: Uuid,
    ) -> Result<Arc<Mutex<SessionEntry>>, SessionError> {
        let session_id = self
            .approval_index
            .read()
            .await
            .get(&approval_id)
            .copied()
            .ok_or(SessionError::ApprovalNotFound(approval_id))?;
        self.entry(session_id).await
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(
        &self,
        model_config: ModelConfig,
        workflow: WorkflowKind,
        require_tool_approval: bool,
    ) -> Result<ChatSession, SessionError> {
        let session = ChatSession::new(model_config, workflow, require_tool_approval);
        let snapshot = session.clone();

        let mut sessions = self.sessions.write().await;
        sessions.insert(
            session.id,
            Arc::new(Mutex::new(SessionEntry {
                session,
                approvals: Vec::new(),
            })),
        );

        if sessions.len() >= SESSION_COUNT_WARNING_THRESHOLD && sessions.len() % 100 == 0 {
            tracing::warn!("High session count: {} sessions in memory", sessions.len());
        }
        tracing::debug!(session_id = %snapshot.id, workflow = %workflow, "Created session");

        Ok(snapshot)
    }

    async fn get_session(&self, session_id: Uuid) -> Result<ChatSession, SessionError> {
        let entry = self.entry(session_id).await?;
        let entry = entry.lock().await;
        Ok(entry.session.clone())
    }

    async fn add_message(
        &self,
        session_id: Uuid,
        role: Role,
        content: &str,
    ) -> Result<(), SessionError> {
        let entry = self.entry(session_id).await?;
        let mut entry = entry.lock().await;

        if role == Role::User
            && let Some(pending) = &entry.session.pending_tool_call
        {
            return Err(SessionError::Conflict {
                session_id,
                approval_id: pending.approval_id,
            });
        }

        entry.session.messages.push(ChatMessage::new(role, content));
        Ok(())
    }

    async fn update_scratchpad(
        &self,
        session_id: Uuid,
        scratchpad: Scratchpad,
    ) -> Result<(), SessionError> {
        let entry = self.entry(session_id).await?;
        entry.lock().await.session.scratchpad = scratchpad;
        Ok(())
    }

    async fn create_approval(
        &self,
        session_id: Uuid,
        tool_name: &str,
        tool_args: serde_json::Value,
    ) -> Result<ToolApproval, SessionError> {
        let entry = self.entry(session_id).await?;
        let mut entry = entry.lock().await;

        if let Some(pending) = &entry.session.pending_tool_call {
            return Err(SessionError::Conflict {
                session_id,
                approval_id: pending.approval_id,
            });
        }

        let now = Utc::now();
        let approval = ToolApproval {
            id: Uuid::new_v4(),
            session_id,
            tool_name: tool_name.to_string(),
            tool_args: tool_args.clone(),
            status: ApprovalStatus::Pending,
            created_at: now,
            resolved_at: None,
            decision_reason: String::new(),
        };

        self.approval_index
            .write()
            .await
            .insert(approval.id, session_id);
        entry.session.pending_tool_call = Some(PendingToolCall {
            approval_id: approval.id,
            tool_name: tool_name.to_string(),
            tool_args,
            created_at: now,
        });
        entry.approvals.push(approval.clone());

        Ok(approval)
    }

    async fn resolve_approval(
        &self,
        approval_id: Uuid,
        decision: ApprovalDecision,
        reason: &str,
    ) -> Result<Resolution, SessionError> {
        let entry = self.entry_for_approval(approval_id).await?;
        let mut entry = entry.lock().await;
        let SessionEntry { session, approvals } = &mut *entry;

        let approval = approvals
            .iter_mut()
            .find(|a| a.id == approval_id)
            .ok_or(SessionError::ApprovalNotFound(approval_id))?;

        let target = decision.status();
        if !approval.status.can_transition_to(target) {
            return Ok(Resolution {
                approval: approval.clone(),
                newly_resolved: false,
            });
        }

        approval.status = target;
        approval.resolved_at = Some(Utc::now());
        approval.decision_reason = reason.to_string();

        if session
            .pending_tool_call
            .as_ref()
            .is_some_and(|p| p.approval_id == approval_id)
        {
            session.pending_tool_call = None;
        }

        Ok(Resolution {
            approval: approval.clone(),
            newly_resolved: true,
        })
    }

    async fn get_approval(&self, approval_id: Uuid) -> Result<ToolApproval, SessionError> {
        let entry = self.entry_for_approval(approval_id).await?;
        let entry = entry.lock().await;
        entry
            .approvals
            .iter()
            .find(|a| a.id == approval_id)
            .cloned()
            .ok_or(SessionError::ApprovalNotFound(approval_id))
    }

    async fn list_approvals(
        &self,
        session_id: Uuid,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<ToolApproval>, SessionError> {
        let entry = self.entry(session_id).await?;
        let entry = entry.lock().await;
        let mut approvals: Vec<ToolApproval> = entry
            .approvals
            .iter()
            .filter(|a| status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        // Creation order is kept in the vec, so reversing gives newest first
        // even when timestamps tie.
        approvals.reverse();
        Ok(approvals)
    }

    async fn record_reply(&self, session_id: Uuid, reply: ChatReply) -> Result<(), SessionError> {
        let entry = self.entry(session_id).await?;
        entry.lock().await.session.last_reply = Some(reply);
        Ok(())
    }
}

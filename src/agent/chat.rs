//! Chat turns over persisted sessions.
//!
//! [`ChatService`] drives a [`ReactLoop`] per turn and turns its outcome
//! into store updates and a [`ChatReply`]. A loop that needs approval is not
//! kept alive: the scratchpad and pending call are persisted and a later
//! [`ChatService::resolve_approval`] picks the run back up from there, in
//! this process or another one sharing the store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::agent::plan::{PlanExecutor, PlanReport};
use crate::agent::react::{
    EXHAUSTED_FALLBACK, LoopOutcome, ReactLoop, Termination, run_tool, tool_observation,
};
use crate::agent::scratchpad::Scratchpad;
use crate::agent::session::{
    ApprovalDecision, ApprovalStatus, ChatReply, ChatSession, ReplyStatus, Role, ToolApproval,
    ToolCallRequest, WorkflowKind,
};
use crate::agent::store::SessionStore;
use crate::config::AgentConfig;
use crate::error::{Result, SessionError};
use crate::llm::{LlmFactory, LlmProvider, ModelConfig};
use crate::tools::{ToolRegistry, ToolSchema};

const DENIED_OBSERVATION: &str = "User denied tool call.";

/// Entry point for sessions, messages and approvals.
pub struct ChatService {
    store: Arc<dyn SessionStore>,
    tools: Arc<ToolRegistry>,
    llm_factory: Arc<dyn LlmFactory>,
    config: AgentConfig,
    turn_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        tools: Arc<ToolRegistry>,
        llm_factory: Arc<dyn LlmFactory>,
        config: AgentConfig,
    ) -> Self {
        Self {
            store,
            tools,
            llm_factory,
            config,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a session. `require_tool_approval` defaults to the configured value.
    pub async fn create_session(
        &self,
        model_config: ModelConfig,
        workflow: WorkflowKind,
        require_tool_approval: Option<bool>,
    ) -> Result<ChatSession> {
        let require = require_tool_approval.unwrap_or(self.config.require_tool_approval);
        Ok(self
            .store
            .create_session(model_config, workflow, require)
            .await?)
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<ChatSession> {
        Ok(self.store.get_session(session_id).await?)
    }

    /// Schemas of every registered tool, in registration order.
    pub async fn list_tools(&self) -> Vec<ToolSchema> {
        self.tools.schemas().await
    }

    /// Approvals of a session, newest first.
    pub async fn list_approvals(
        &self,
        session_id: Uuid,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<ToolApproval>> {
        Ok(self.store.list_approvals(session_id, status).await?)
    }

    /// Run one ReAct turn for a new user message.
    ///
    /// `require_tool_approval` overrides the session's gating for this turn
    /// only; a resumed run uses the session setting.
    pub async fn send_message(
        &self,
        session_id: Uuid,
        content: &str,
        require_tool_approval: Option<bool>,
    ) -> Result<ChatReply> {
        let lock = self.turn_lock(session_id).await;
        let _turn = lock.lock().await;

        let session = self.store.get_session(session_id).await?;
        ensure_workflow(&session, WorkflowKind::React)?;
        if let Some(pending) = &session.pending_tool_call {
            return Err(SessionError::Conflict {
                session_id,
                approval_id: pending.approval_id,
            }
            .into());
        }

        let require = require_tool_approval.unwrap_or(session.require_tool_approval);
        let llm = self.llm_factory.create(&session.model_config)?;

        self.store
            .add_message(session_id, Role::User, content)
            .await?;

        self.run_turn(&session, llm, content, session.scratchpad.clone(), require)
            .await
    }

    /// Record a decision on a pending tool call and resume the suspended run.
    ///
    /// Resolving an approval a second time changes nothing and returns the
    /// reply of the turn that followed the first resolution.
    pub async fn resolve_approval(
        &self,
        session_id: Uuid,
        approval_id: Uuid,
        decision: ApprovalDecision,
        reason: &str,
    ) -> Result<ChatReply> {
        let lock = self.turn_lock(session_id).await;
        let _turn = lock.lock().await;

        let session = self.store.get_session(session_id).await?;
        let approval = self.store.get_approval(approval_id).await?;
        if approval.session_id != session_id {
            return Err(SessionError::ApprovalNotFound(approval_id).into());
        }
        ensure_workflow(&session, WorkflowKind::React)?;

        if approval.status.is_terminal() {
            return Ok(already_resolved_reply(&session, &approval));
        }

        let llm = self.llm_factory.create(&session.model_config)?;
        let resolution = self
            .store
            .resolve_approval(approval_id, decision, reason)
            .await?;
        if !resolution.newly_resolved {
            return Ok(already_resolved_reply(&session, &resolution.approval));
        }

        tracing::info!(
            session_id = %session_id,
            approval_id = %approval_id,
            tool = %approval.tool_name,
            decision = %resolution.approval.status,
            "Approval resolved, resuming"
        );

        let mut scratchpad = session.scratchpad.clone();
        match decision {
            ApprovalDecision::Approve => {
                let Some(tool) = self.tools.get(&approval.tool_name).await else {
                    let reply = ChatReply::invalid(
                        session_id,
                        format!("tool not found: {}", approval.tool_name),
                    );
                    self.store.record_reply(session_id, reply.clone()).await?;
                    return Ok(reply);
                };
                let result = run_tool(tool.as_ref(), approval.tool_args.clone()).await;
                scratchpad.push_observation(&tool_observation(&result));
            }
            ApprovalDecision::Deny => {
                let observation = if reason.trim().is_empty() {
                    DENIED_OBSERVATION.to_string()
                } else {
                    format!("{DENIED_OBSERVATION} Reason: {}", reason.trim())
                };
                scratchpad.push_observation(&observation);
            }
        }

        let input = session.last_user_message().unwrap_or_default().to_string();
        self.run_turn(
            &session,
            llm,
            &input,
            scratchpad,
            session.require_tool_approval,
        )
        .await
    }

    /// Plan and execute a request in a plan-and-execute session.
    pub async fn run_plan(
        &self,
        session_id: Uuid,
        user_input: &str,
        max_steps: Option<usize>,
    ) -> Result<PlanReport> {
        let lock = self.turn_lock(session_id).await;
        let _turn = lock.lock().await;

        let session = self.store.get_session(session_id).await?;
        ensure_workflow(&session, WorkflowKind::PlanAndExecute)?;
        let llm = self.llm_factory.create(&session.model_config)?;

        self.store
            .add_message(session_id, Role::User, user_input)
            .await?;

        let report = PlanExecutor::new(llm, Arc::clone(&self.tools))
            .with_options(session.model_config.generate_options())
            .run(
                user_input,
                max_steps.unwrap_or(self.config.plan_max_steps),
            )
            .await?;

        self.store
            .add_message(session_id, Role::Assistant, &plan_summary(&report))
            .await?;
        Ok(report)
    }

    /// Per-session turn lock. Entries no turn currently holds are pruned, so
    /// the map only grows with the number of concurrently active sessions.
    async fn turn_lock(&self, session_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        locks.retain(|id, lock| *id == session_id || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(session_id).or_default())
    }

    async fn run_turn(
        &self,
        session: &ChatSession,
        llm: Arc<dyn LlmProvider>,
        user_input: &str,
        mut scratchpad: Scratchpad,
        require_approval: bool,
    ) -> Result<ChatReply> {
        let session_id = session.id;
        let react = ReactLoop::new(llm, Arc::clone(&self.tools), self.config.max_iterations)
            .with_options(session.model_config.generate_options());

        let outcome = match react.run(user_input, &mut scratchpad, require_approval).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "Model call failed during turn"
                );
                self.store.update_scratchpad(session_id, scratchpad).await?;
                return Err(e.into());
            }
        };

        let reply = match outcome {
            LoopOutcome::Terminated(Termination::Final { answer }) => {
                self.store.update_scratchpad(session_id, scratchpad).await?;
                self.store
                    .add_message(session_id, Role::Assistant, &answer)
                    .await?;
                ChatReply::completed(session_id, answer)
            }
            LoopOutcome::Terminated(termination) => {
                self.store.update_scratchpad(session_id, scratchpad).await?;
                let mut reply =
                    ChatReply::invalid(session_id, termination.error().unwrap_or_default());
                if matches!(termination, Termination::Exhausted { .. }) {
                    reply.assistant = EXHAUSTED_FALLBACK.to_string();
                }
                reply
            }
            LoopOutcome::AwaitingApproval(call) => {
                let approval = self
                    .store
                    .create_approval(session_id, &call.tool.name, call.arguments.clone())
                    .await?;
                self.store.update_scratchpad(session_id, scratchpad).await?;
                tracing::info!(
                    session_id = %session_id,
                    approval_id = %approval.id,
                    tool = %call.tool.name,
                    "Waiting for tool approval"
                );
                ChatReply::approval_required(
                    session_id,
                    ToolCallRequest {
                        approval_id: approval.id,
                        tool_name: call.tool.name,
                        tool_description: call.tool.description,
                        tool_parameters: call.tool.parameters,
                        tool_args: call.arguments,
                    },
                )
            }
        };

        self.store.record_reply(session_id, reply.clone()).await?;
        Ok(reply)
    }
}

fn ensure_workflow(session: &ChatSession, expected: WorkflowKind) -> Result<()> {
    if session.workflow == expected {
        return Ok(());
    }
    Err(SessionError::UnsupportedWorkflow {
        session_id: session.id,
        workflow: session.workflow.to_string(),
    }
    .into())
}

/// Reply for a retried resolution: the reply of the turn that followed the
/// first resolution, or a description of the outcome if there is none.
fn already_resolved_reply(session: &ChatSession, approval: &ToolApproval) -> ChatReply {
    let stale = |reply: &ChatReply| {
        reply.status == ReplyStatus::ToolApprovalRequired
            && reply
                .tool_call
                .as_ref()
                .is_some_and(|c| c.approval_id == approval.id)
    };

    match &session.last_reply {
        Some(reply) if !stale(reply) => reply.clone(),
        _ => ChatReply::invalid(
            session.id,
            format!("approval {} already resolved as {}", approval.id, approval.status),
        ),
    }
}

fn plan_summary(report: &PlanReport) -> String {
    match report.steps.iter().find(|s| !s.ok) {
        None => format!("Executed {} step(s) successfully.", report.steps.len()),
        Some(failed) => format!(
            "Plan halted at step {} ({}) after {} step(s).",
            failed.index,
            failed.tool,
            report.steps.len()
        ),
    }
}

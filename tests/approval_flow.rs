//! End-to-end approval gating through `ChatService`.

use std::sync::Arc;

use gatekeep::agent::{
    ApprovalDecision, ApprovalStatus, ChatService, InMemorySessionStore, ReplyStatus, Role,
    SessionState, WorkflowKind,
};
use gatekeep::config::AgentConfig;
use gatekeep::error::{Error, SessionError};
use gatekeep::llm::{DefaultLlmFactory, ModelConfig, RetryConfig};
use gatekeep::testing::{FixedLlmFactory, RecordingTool, ScriptedLlm};
use gatekeep::tools::ToolRegistry;
use serde_json::json;

const ECHO_CALL: &str =
    "Thought: I should echo.\nAction: echo\nAction Input: {\"message\": \"hi\"}";

async fn builtin_service() -> ChatService {
    let tools = Arc::new(ToolRegistry::new());
    tools.register_builtin_tools().await;
    ChatService::new(
        Arc::new(InMemorySessionStore::new()),
        tools,
        Arc::new(DefaultLlmFactory::new(RetryConfig::default())),
        AgentConfig::default(),
    )
}

async fn scripted_service(
    llm: Arc<ScriptedLlm>,
    tool: Arc<RecordingTool>,
) -> ChatService {
    let tools = Arc::new(ToolRegistry::new());
    tools.register(tool).await;
    ChatService::new(
        Arc::new(InMemorySessionStore::new()),
        tools,
        Arc::new(FixedLlmFactory::new(llm)),
        AgentConfig::default(),
    )
}

#[tokio::test]
async fn test_fake_model_search_approved() {
    let workspace = tempfile::tempdir().unwrap();
    std::fs::write(workspace.path().join("a.txt"), "TODO: write tests").unwrap();
    std::fs::write(workspace.path().join("b.txt"), "nothing here").unwrap();

    let service = builtin_service().await;
    let session = service
        .create_session(
            ModelConfig::for_provider("fake-react"),
            WorkflowKind::React,
            None,
        )
        .await
        .unwrap();

    let message = format!(
        "Find my TODO notes. WORKSPACE_DIR={}",
        workspace.path().display()
    );
    let reply = service
        .send_message(session.id, &message, None)
        .await
        .unwrap();
    assert_eq!(reply.status, ReplyStatus::ToolApprovalRequired);
    let call = reply.tool_call.unwrap();
    assert_eq!(call.tool_name, "batch-file-search");
    assert_eq!(
        call.tool_args["search_path"],
        json!(workspace.path().display().to_string())
    );
    assert_eq!(
        service.get_session(session.id).await.unwrap().state(),
        SessionState::PendingApproval
    );

    let reply = service
        .resolve_approval(session.id, call.approval_id, ApprovalDecision::Approve, "")
        .await
        .unwrap();
    assert_eq!(reply.status, ReplyStatus::Completed);
    assert_eq!(reply.assistant, "ok");

    let session = service.get_session(session.id).await.unwrap();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.scratchpad.as_str().contains("\"matched_count\":1"));
    let roles: Vec<Role> = session.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);

    let approvals = service
        .list_approvals(session.id, Some(ApprovalStatus::Approved))
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
    assert!(approvals[0].resolved_at.is_some());
}

#[tokio::test]
async fn test_denial_reason_reaches_model() {
    let llm = Arc::new(ScriptedLlm::new([ECHO_CALL, "Final Answer: understood"]));
    let tool = Arc::new(RecordingTool::new("echo"));
    let service = scripted_service(llm.clone(), tool.clone()).await;
    let session = service
        .create_session(ModelConfig::default(), WorkflowKind::React, Some(true))
        .await
        .unwrap();

    let reply = service.send_message(session.id, "say hi", None).await.unwrap();
    let approval_id = reply.tool_call.unwrap().approval_id;

    let reply = service
        .resolve_approval(session.id, approval_id, ApprovalDecision::Deny, "not now")
        .await
        .unwrap();
    assert_eq!(reply.status, ReplyStatus::Completed);
    assert_eq!(reply.assistant, "understood");
    assert_eq!(tool.calls(), 0);

    let prompts = llm.prompts();
    assert!(prompts[1].contains("Observation: User denied tool call. Reason: not now"));

    let approval = &service.list_approvals(session.id, None).await.unwrap()[0];
    assert_eq!(approval.status, ApprovalStatus::Denied);
    assert_eq!(approval.decision_reason, "not now");
}

#[tokio::test]
async fn test_message_while_pending_conflicts() {
    let llm = Arc::new(ScriptedLlm::new([ECHO_CALL]));
    let tool = Arc::new(RecordingTool::new("echo"));
    let service = scripted_service(llm.clone(), tool).await;
    let session = service
        .create_session(ModelConfig::default(), WorkflowKind::React, None)
        .await
        .unwrap();

    service.send_message(session.id, "say hi", None).await.unwrap();
    let err = service
        .send_message(session.id, "hello?", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Session(SessionError::Conflict { .. })
    ));
    assert_eq!(llm.calls(), 1);
    assert_eq!(service.get_session(session.id).await.unwrap().messages.len(), 1);
}

#[tokio::test]
async fn test_ungated_session_runs_tools_inline() {
    let llm = Arc::new(ScriptedLlm::new([ECHO_CALL, "Final Answer: echoed"]));
    let tool = Arc::new(RecordingTool::new("echo").with_result(json!({"echoed": "hi"})));
    let service = scripted_service(llm, tool.clone()).await;
    let session = service
        .create_session(ModelConfig::default(), WorkflowKind::React, Some(false))
        .await
        .unwrap();

    let reply = service.send_message(session.id, "say hi", None).await.unwrap();
    assert_eq!(reply.status, ReplyStatus::Completed);
    assert_eq!(reply.assistant, "echoed");
    assert_eq!(tool.last_params(), Some(json!({"message": "hi"})));
    assert!(
        service
            .list_approvals(session.id, None)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_repeated_resolution_is_idempotent() {
    let llm = Arc::new(ScriptedLlm::new([ECHO_CALL, "Final Answer: done"]));
    let tool = Arc::new(RecordingTool::new("echo"));
    let service = scripted_service(llm.clone(), tool.clone()).await;
    let session = service
        .create_session(ModelConfig::default(), WorkflowKind::React, None)
        .await
        .unwrap();

    let approval_id = service
        .send_message(session.id, "say hi", None)
        .await
        .unwrap()
        .tool_call
        .unwrap()
        .approval_id;

    let first = service
        .resolve_approval(session.id, approval_id, ApprovalDecision::Approve, "")
        .await
        .unwrap();
    let second = service
        .resolve_approval(session.id, approval_id, ApprovalDecision::Deny, "changed my mind")
        .await
        .unwrap();

    assert_eq!(first.status, ReplyStatus::Completed);
    assert_eq!(second.status, first.status);
    assert_eq!(second.assistant, first.assistant);
    assert_eq!(tool.calls(), 1);
    assert_eq!(llm.calls(), 2);

    let approval = &service.list_approvals(session.id, None).await.unwrap()[0];
    assert_eq!(approval.status, ApprovalStatus::Approved);
}

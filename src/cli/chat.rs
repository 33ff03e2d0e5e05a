//! `chat` command: a ReAct session on the terminal.

use std::io::Write;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use uuid::Uuid;

use crate::agent::{ApprovalDecision, ChatService, ReplyStatus, ToolCallRequest, WorkflowKind};
use crate::llm::ModelConfig;

type StdinLines = Lines<BufReader<Stdin>>;

#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Send one message and exit
    #[arg(short, long)]
    pub message: Option<String>,

    /// Approve every tool call without asking
    #[arg(long)]
    pub auto_approve: bool,

    /// Run tools without asking for approval
    #[arg(long, conflicts_with = "auto_approve")]
    pub no_approval: bool,
}

/// Run an interactive (or single-message) chat session.
pub async fn run_chat_command(
    service: &ChatService,
    model: ModelConfig,
    args: ChatArgs,
) -> anyhow::Result<()> {
    let session = service
        .create_session(model, WorkflowKind::React, args.no_approval.then_some(false))
        .await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Some(message) = &args.message {
        return drive_turn(service, session.id, message, &args, &mut lines).await;
    }

    println!("Session {} (empty line or Ctrl-D to quit)", session.id);
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        drive_turn(service, session.id, line, &args, &mut lines).await?;
    }
    Ok(())
}

async fn drive_turn(
    service: &ChatService,
    session_id: Uuid,
    message: &str,
    args: &ChatArgs,
    lines: &mut StdinLines,
) -> anyhow::Result<()> {
    let mut reply = service.send_message(session_id, message, None).await?;

    loop {
        match reply.status {
            ReplyStatus::Completed => {
                println!("{}", reply.assistant);
                return Ok(());
            }
            ReplyStatus::InvalidDecision => {
                if !reply.assistant.is_empty() {
                    println!("{}", reply.assistant);
                }
                eprintln!("error: {}", reply.error);
                return Ok(());
            }
            ReplyStatus::ToolApprovalRequired => {
                let Some(call) = reply.tool_call.take() else {
                    anyhow::bail!("approval requested without a tool call");
                };
                let (decision, reason) = if args.auto_approve {
                    println!("Auto-approving {} {}", call.tool_name, call.tool_args);
                    (ApprovalDecision::Approve, String::new())
                } else {
                    ask_for_approval(&call, lines).await?
                };
                reply = service
                    .resolve_approval(session_id, call.approval_id, decision, &reason)
                    .await?;
            }
        }
    }
}

async fn ask_for_approval(
    call: &ToolCallRequest,
    lines: &mut StdinLines,
) -> anyhow::Result<(ApprovalDecision, String)> {
    println!("Tool call requested: {}", call.tool_name);
    println!("    {}", call.tool_description);
    println!("    args: {}", call.tool_args);
    print!("Approve? [y/N, or type a reason to deny] ");
    std::io::stdout().flush()?;

    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(parse_answer(&answer))
}

fn parse_answer(answer: &str) -> (ApprovalDecision, String) {
    let answer = answer.trim();
    match answer.to_lowercase().as_str() {
        "y" | "yes" => (ApprovalDecision::Approve, String::new()),
        "" | "n" | "no" => (ApprovalDecision::Deny, String::new()),
        _ => (ApprovalDecision::Deny, answer.to_string()),
    }
}

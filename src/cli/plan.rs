//! `plan` command.

use clap::Args;

use crate::agent::{ChatService, WorkflowKind};
use crate::llm::ModelConfig;

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// What the plan should accomplish
    pub request: String,

    /// Maximum number of steps to execute (defaults to PLAN_MAX_STEPS)
    #[arg(long)]
    pub max_steps: Option<usize>,
}

/// Plan once, execute, and print the JSON report.
pub async fn run_plan_command(
    service: &ChatService,
    model: ModelConfig,
    args: PlanArgs,
) -> anyhow::Result<()> {
    let session = service
        .create_session(model, WorkflowKind::PlanAndExecute, Some(false))
        .await?;
    let report = service
        .run_plan(session.id, &args.request, args.max_steps)
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.succeeded() {
        anyhow::bail!("plan halted before completing every step");
    }
    Ok(())
}

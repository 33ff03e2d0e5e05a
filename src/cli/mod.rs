//! CLI command handling.
//!
//! Provides subcommands for:
//! - Listing the registered tools (`tools`)
//! - Chatting with approval prompts on stdin (`chat`)
//! - Running plan-and-execute once (`plan`)

mod chat;
mod plan;
mod tools;

pub use chat::{ChatArgs, run_chat_command};
pub use plan::{PlanArgs, run_plan_command};
pub use tools::{ToolsArgs, run_tools_command};

use std::sync::Arc;

use clap::{ColorChoice, Parser, Subcommand};

use crate::agent::{ChatService, InMemorySessionStore};
use crate::config::Config;
use crate::llm::{DefaultLlmFactory, ModelConfig};
use crate::tools::ToolRegistry;

#[derive(Parser, Debug)]
#[command(name = "gatekeep")]
#[command(about = "ReAct agent with human approval of tool calls")]
#[command(
    long_about = "Gatekeep runs a tool-using agent that asks before it acts.\nExamples:\n  gatekeep chat  # Interactive session\n  gatekeep plan 'find TODOs in ./notes'  # One-shot plan"
)]
#[command(version)]
#[command(color = ColorChoice::Auto)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Model provider (overrides LLM_PROVIDER)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model name (overrides LLM_MODEL)
    #[arg(long, global = true)]
    pub model: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the registered tools
    #[command(
        about = "List tools",
        long_about = "Shows every registered tool with its description.\nExample: gatekeep tools --json"
    )]
    Tools(ToolsArgs),

    /// Chat with the agent
    #[command(
        about = "Chat with the agent",
        long_about = "Runs a ReAct session, asking on stdin before each tool call.\nExamples:\n  gatekeep chat\n  gatekeep chat -m 'find TODOs WORKSPACE_DIR=./notes' --auto-approve"
    )]
    Chat(ChatArgs),

    /// Plan once, then execute the plan
    #[command(
        about = "Plan and execute",
        long_about = "Asks the model for a JSON plan and runs its steps in order.\nExample: gatekeep plan 'create three weekly notes in ./notes'"
    )]
    Plan(PlanArgs),
}

impl Cli {
    /// Model config from the resolved config plus command-line overrides.
    pub fn model_config(&self, config: &Config) -> ModelConfig {
        let mut model = config.llm.model_config();
        if let Some(provider) = &self.provider {
            model.provider = provider.clone();
            model.name = provider.clone();
        }
        if let Some(name) = &self.model {
            model.model = name.clone();
        }
        model
    }
}

/// Wire a [`ChatService`] with the built-in tools and an in-memory store.
pub async fn build_service(config: &Config) -> ChatService {
    let tools = Arc::new(ToolRegistry::new());
    tools.register_builtin_tools().await;
    tracing::debug!(count = tools.count().await, "Tools registered");

    ChatService::new(
        Arc::new(InMemorySessionStore::new()),
        tools,
        Arc::new(DefaultLlmFactory::new(config.llm.retry)),
        config.agent.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_flags() {
        let cli = Cli::try_parse_from([
            "gatekeep",
            "--provider",
            "deepseek",
            "chat",
            "-m",
            "hi",
            "--auto-approve",
        ])
        .unwrap();

        let Command::Chat(args) = &cli.command else {
            panic!("expected chat");
        };
        assert_eq!(args.message.as_deref(), Some("hi"));
        assert!(args.auto_approve);

        let model = cli.model_config(&Config::default());
        assert_eq!(model.provider, "deepseek");
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from(["gatekeep", "plan", "do it", "--max-steps", "3"]).unwrap();
        let Command::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(args.request, "do it");
        assert_eq!(args.max_steps, Some(3));
    }

    #[tokio::test]
    async fn test_build_service_registers_builtins() {
        let service = build_service(&Config::default()).await;
        let names: Vec<String> = service.list_tools().await.into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["echo", "batch-file-search", "batch-file-create"]);
    }
}

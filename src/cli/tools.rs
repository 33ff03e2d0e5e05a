//! `tools` command.

use clap::Args;

use crate::agent::ChatService;

#[derive(Args, Debug, Clone)]
pub struct ToolsArgs {
    /// Print full schemas as JSON
    #[arg(long)]
    pub json: bool,
}

/// List the registered tools.
pub async fn run_tools_command(service: &ChatService, args: ToolsArgs) -> anyhow::Result<()> {
    let schemas = service.list_tools().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&schemas)?);
        return Ok(());
    }

    for schema in schemas {
        println!("{}", schema.name);
        println!("    {}", schema.description);
    }
    Ok(())
}

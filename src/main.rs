//! Gatekeep - main entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gatekeep::{
    cli::{Cli, Command, build_service, run_chat_command, run_plan_command, run_tools_command},
    config::Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env()?;
    let model = cli.model_config(&config);
    let service = build_service(&config).await;

    tracing::debug!(provider = %model.provider, "Configuration loaded");

    match cli.command {
        Command::Tools(args) => run_tools_command(&service, args).await,
        Command::Chat(args) => run_chat_command(&service, model, args).await,
        Command::Plan(args) => run_plan_command(&service, model, args).await,
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gatekeep=info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    // Logs go to stderr so command output on stdout stays clean.
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

use clap::Parser;
use tracing::Level;

use cc_supervisor::cli::{self, Cli, Commands, StateAction};
use cc_supervisor::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init(Level::INFO);

    if let Err(e) = run(cli).await {
        eprintln!("cc-supervisor: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path();

    match cli.command {
        Commands::Hook => {
            // Any error here writes no decision; the host then lets the session stop.
            let outcome = cli::hook::run_hook(&config_path).await?;
            tracing::debug!(?outcome, "hook finished");
        }
        Commands::State { action } => match action {
            StateAction::Show { session_id } => {
                cli::state::run_show(&config_path, &session_id).await?
            }
            StateAction::Reset { session_id } => {
                cli::state::run_reset(&config_path, &session_id).await?
            }
            StateAction::Enable { session_id } => {
                cli::state::run_enable(&config_path, &session_id).await?
            }
            StateAction::Disable { session_id } => {
                cli::state::run_disable(&config_path, &session_id).await?
            }
        },
        Commands::Config => cli::config_cmd::run_config(&config_path).await?,
        Commands::HookConfig => cli::config_cmd::run_hook_config(&config_path).await?,
    }
    Ok(())
}

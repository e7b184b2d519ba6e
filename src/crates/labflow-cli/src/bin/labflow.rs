//! labflow CLI - Multi-agent research pipeline
//!
//! Main entry point for the labflow command-line tool.

use clap::Parser;
use colored::Colorize;
use labflow_cli::{commands, logging, Cli, Commands, RunOptions};
use labflow_team::ConfigLoader;
use std::process::ExitCode;
use tracing::instrument::WithSubscriber;

/// Exit code when a run hits its step ceiling
const EXIT_NON_CONVERGENCE: u8 = 3;

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_explicit(path);
    }
    let config = loader.load().with_subscriber(logging::bootstrap(cli.verbose)).await?;
    logging::init(&config.logging, cli.verbose);

    match cli.command {
        Commands::Run {
            prompt,
            auto_approve,
            max_steps,
            json,
        } => {
            let options = RunOptions {
                auto_approve,
                max_steps,
                json,
            };
            commands::run(config, prompt, options).await
        }
        Commands::Graph => {
            println!("{}", commands::graph()?);
            Ok(())
        }
        Commands::Config => {
            print!("{}", commands::config(&config)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if commands::is_non_convergence(&err) => {
            eprintln!("{} {:#}", "✗ Run did not converge:".yellow().bold(), err);
            eprintln!("  Raise workflow.step_ceiling or pass --max-steps to allow more steps.");
            ExitCode::from(EXIT_NON_CONVERGENCE)
        }
        Err(err) => {
            eprintln!("{} {:#}", "✗ Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

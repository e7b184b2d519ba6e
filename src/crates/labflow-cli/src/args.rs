//! Command-line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "labflow")]
#[command(about = "labflow - Multi-agent research pipeline with human checkpoints", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Config file applied on top of the user and project configs
    #[arg(short, long, global = true, env = "LABFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the research workflow on a request
    Run {
        /// Research request seeding the conversation
        prompt: String,

        /// Answer "proceed" and "approve" at every checkpoint
        #[arg(long)]
        auto_approve: bool,

        /// Override the step ceiling
        #[arg(long)]
        max_steps: Option<usize>,

        /// Print each snapshot as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Print the workflow graph as a Mermaid flowchart
    Graph,

    /// Print the effective configuration (API keys masked)
    Config,
}

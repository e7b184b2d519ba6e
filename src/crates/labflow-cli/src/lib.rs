//! # labflow-cli - Command-line runner for the research team
//!
//! The `labflow` binary loads the layered configuration, installs the log
//! subscriber and dispatches to one of the subcommands in [`commands`].
//! Human checkpoints are answered on the terminal ([`console::Console`]) or
//! automatically with `--auto-approve`.

pub mod args;
pub mod commands;
pub mod console;
pub mod logging;

pub use args::{Cli, Commands};
pub use commands::RunOptions;
pub use console::{parse_choice, parse_review, AutoDecision, Console};

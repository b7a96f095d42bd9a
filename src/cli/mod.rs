//! Command line front end over the partials.
//!
//! Each subcommand builds a request from its flags, plans it with the
//! matching partial and either prints the plan (`--dry-run`) or runs it
//! with the [`LocalExecutor`](crate::action::LocalExecutor).

pub mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, RuntimeConfig, SigningArgs};
pub use commands::execute_command;
pub use output::OutputManager;

/// Main CLI entry point
pub async fn run() -> anyhow::Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}

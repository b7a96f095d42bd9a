//! Subcommand execution.

mod archive;
mod dsym;
mod sign;

use crate::action::{Action, LocalExecutor};
use crate::cli::{Args, Command, RuntimeConfig};
use anyhow::Result;
use serde::Serialize;

use archive::execute_process_archive;
use dsym::execute_dsym;
use sign::execute_sign_command;

/// Execute the subcommand selected by `args`
pub async fn execute_command(args: Args) -> Result<i32> {
    let config = RuntimeConfig::from_args(&args)?;
    log::debug!("Running {} with {:?}", args.command.name(), config.platform());

    let result = match &args.command {
        Command::SignCommand { .. } => execute_sign_command(&args, &config),
        Command::ProcessArchive { .. } => execute_process_archive(&args, &config).await,
        Command::Dsym { .. } => execute_dsym(&args, &config).await,
    };

    match result {
        Ok(code) => Ok(code),
        Err(e) => {
            config
                .output()
                .error(&format!("Command '{}' failed: {e:#}", args.command.name()));
            Ok(1)
        }
    }
}

/// Prints `plan` as JSON in dry-run mode, otherwise runs its actions.
pub(super) async fn run_or_print<P: Serialize>(
    config: &RuntimeConfig,
    plan: &P,
    actions: &[Action],
) -> Result<()> {
    if config.is_dry_run() {
        config.output().result(&serde_json::to_string_pretty(plan)?)?;
        return Ok(());
    }

    let executor = LocalExecutor::new(config.exec_root());
    for action in actions {
        config.output().verbose(action.mnemonic())?;
    }
    executor.execute_all(actions).await?;
    Ok(())
}

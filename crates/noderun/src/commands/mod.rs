//! Subcommand implementations.
//!
//! Each command returns the text destined for stdout; the binary prints it.

pub mod list;
pub mod run;

use crate::cli::{Cli, CliError, Commands};
use crate::config::Settings;
use tokio_util::sync::CancellationToken;

/// Execute the parsed command line.
///
/// `cancel` is fired by the interrupt handler and stops a run from
/// dispatching further nodes.
pub async fn execute(cli: &Cli, cancel: CancellationToken) -> Result<String, CliError> {
    let settings = Settings::load(cli.config.as_deref())?;
    match &cli.command {
        Commands::Run(args) => run::execute(args, &settings, cli.json, cancel).await,
        Commands::List(args) => list::execute(args, &settings, cli.json),
    }
}

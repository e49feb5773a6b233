//! Command implementations.

mod instrument;
mod run;

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Instrument(args) => instrument::cmd_instrument(args),
        Commands::Run(args) => run::cmd_run(args),
    }
}

//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::{Args, Parser, Subcommand};
use edgecov_pass::{ENV_HARDEN, ENV_INST_RATIO, ENV_QUIET, ENV_WHITELIST};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "edgecov")]
#[command(about = "AFL-style edge coverage instrumentation")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Instrument a JSON module
    Instrument(InstrumentArgs),
    /// Execute a JSON module and print the coverage it produced
    Run(RunArgs),
}

#[derive(Args)]
pub struct InstrumentArgs {
    /// Input module
    #[arg(value_name = "MODULE")]
    pub input: PathBuf,

    /// Output module (defaults to overwriting the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// File of source filename suffixes to instrument, one per line
    #[arg(long, env = ENV_WHITELIST)]
    pub whitelist: Option<PathBuf>,

    /// Percentage of eligible blocks to instrument (1-100)
    #[arg(long, env = ENV_INST_RATIO)]
    pub ratio: Option<String>,

    /// Suppress the banner and summary
    #[arg(long, env = ENV_QUIET, value_parser = FalseyValueParser::new())]
    pub quiet: bool,

    /// Report the build as hardened
    #[arg(long, env = ENV_HARDEN, value_parser = FalseyValueParser::new())]
    pub harden: bool,

    /// Fixed seed for location ids (random by default)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the instrumented module as text instead of writing JSON
    #[arg(long)]
    pub emit_text: bool,
}

#[derive(Args)]
pub struct RunArgs {
    /// Module to execute
    #[arg(value_name = "MODULE")]
    pub input: PathBuf,

    /// Function to call
    #[arg(long, default_value = "main")]
    pub entry: String,

    /// Integer argument, repeatable
    #[arg(long = "arg", value_name = "N")]
    pub args: Vec<u64>,

    /// Instruction budget
    #[arg(long, default_value_t = edgecov_rt::DEFAULT_STEP_BUDGET)]
    pub max_steps: u64,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_instrument() {
        let cli = Cli::try_parse_from([
            "edgecov",
            "instrument",
            "in.json",
            "-o",
            "out.json",
            "--ratio",
            "30",
            "--seed",
            "7",
            "--quiet",
        ])
        .expect("valid args");
        let Commands::Instrument(args) = cli.command else {
            panic!("expected instrument");
        };
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
        assert_eq!(args.ratio.as_deref(), Some("30"));
        assert_eq!(args.seed, Some(7));
        assert!(args.quiet);
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "edgecov", "-v", "run", "m.json", "--entry", "f", "--arg", "3", "--arg", "4",
        ])
        .expect("valid args");
        assert!(cli.verbose);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.entry, "f");
        assert_eq!(args.args, vec![3, 4]);
    }
}

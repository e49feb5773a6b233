//! Instrument command.

use edgecov::{InstRatio, InstrumentConfig};
use tracing::error;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS, InstrumentArgs};
use crate::terminal;

/// Build the pass configuration from flags (which already fall back to the
/// `AFL_*` variables).
fn config_from_args(args: &InstrumentArgs) -> edgecov::Result<InstrumentConfig> {
    let ratio = match &args.ratio {
        Some(value) => value.parse::<InstRatio>()?,
        None => InstRatio::default(),
    };
    let mut config = InstrumentConfig::new()
        .with_ratio(ratio)
        .with_quiet(args.quiet)
        .with_hardened(args.harden);
    if let Some(path) = &args.whitelist {
        config = config.with_whitelist(path);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    Ok(config)
}

/// Handle the `instrument` command.
pub fn cmd_instrument(args: &InstrumentArgs) -> i32 {
    let config = match config_from_args(args) {
        Ok(config) => config,
        Err(e) => {
            terminal::error(&e.to_string());
            return EXIT_FAILURE;
        }
    };

    let mut module = match edgecov::load_module(&args.input) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, path = %args.input.display(), "failed to load module");
            return EXIT_FAILURE;
        }
    };

    let quiet = config.quiet;
    let stats = match edgecov::instrument_module(&mut module, config) {
        Ok(stats) => stats,
        Err(e) => {
            terminal::error(&e.to_string());
            return EXIT_FAILURE;
        }
    };

    if args.emit_text {
        print!("{module}");
        return EXIT_SUCCESS;
    }

    let output = args.output.as_ref().unwrap_or(&args.input);
    if let Err(e) = edgecov::save_module(&module, output) {
        error!(error = %e, "failed to write module");
        return EXIT_FAILURE;
    }
    if !quiet {
        terminal::success(&format!(
            "{} of {} blocks instrumented",
            stats.blocks_instrumented, stats.blocks_total
        ));
        terminal::path_output(output);
    }
    EXIT_SUCCESS
}

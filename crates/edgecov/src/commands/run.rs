//! Run command.

use edgecov::{Machine, Outcome};
use tracing::error;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS, RunArgs};
use crate::terminal;

/// Handle the `run` command.
pub fn cmd_run(args: &RunArgs) -> i32 {
    let module = match edgecov::load_module(&args.input) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, path = %args.input.display(), "failed to load module");
            return EXIT_FAILURE;
        }
    };
    if module.global_by_name(edgecov_rt::AREA_PTR_SYMBOL).is_none() {
        terminal::warning("module is not instrumented; no coverage will be recorded");
    }

    let mut machine = Machine::new(&module).with_step_budget(args.max_steps);
    terminal::info(&format!("calling @{}", args.entry));
    let outcome = match machine.call(&args.entry, &args.args) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, entry = %args.entry, "execution failed");
            return EXIT_FAILURE;
        }
    };

    match outcome {
        Outcome::Return(Some(value)) => println!("returned {value}"),
        Outcome::Return(None) => println!("returned"),
        Outcome::Unwind(payload) => println!("unwound with payload {payload}"),
    }
    let map = machine.map();
    for (index, count) in map.hit_cells() {
        println!("  cell {index:5}: {count}");
    }
    println!("{} edges hit", map.count_nonzero());
    edgecov::metrics::record_run(map, machine.steps());
    EXIT_SUCCESS
}

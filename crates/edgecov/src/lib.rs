//! edgecov - AFL-style edge coverage for `edgecov-ir` modules
//!
//! Instruments every eligible basic block so that executing the module
//! records `(previous block, current block)` transitions in a 64 KiB
//! hit-count map, then runs instrumented modules to read that map back.
//!
//! # Example
//!
//! ```ignore
//! use edgecov::{InstrumentConfig, Machine};
//!
//! let mut module = edgecov::load_module("prog.json")?;
//! let stats = edgecov::instrument_module(&mut module, InstrumentConfig::from_env()?)?;
//! let mut machine = Machine::new(&module);
//! machine.call("main", &[])?;
//! println!("{} edges", machine.map().count_nonzero());
//! ```

pub use edgecov_ir::{Module, VerifyError, verify_module};
pub use edgecov_pass::{
    ConfigError, CoveragePass, InstRatio, InstrumentConfig, InstrumentStats, PassError,
    Whitelist,
};
pub use edgecov_rt::{CoverageMap, ExecError, MAP_SIZE, Machine, MapError, Outcome};

mod error;
pub mod metrics;

pub use error::{Error, Result};

use std::path::Path;

use tracing::debug;

/// Read and verify a JSON module.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a module, or fails
/// verification.
pub fn load_module(path: impl AsRef<Path>) -> Result<Module> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let module: Module = serde_json::from_str(&text).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    verify_module(&module)?;
    debug!(
        path = %path.display(),
        functions = module.functions.len(),
        blocks = module.block_count(),
        "loaded module"
    );
    Ok(module)
}

/// Write a module as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn save_module(module: &Module, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(module)?;
    std::fs::write(path, text).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Instrument `module` in place.
///
/// The module is verified before and after; a failure afterwards would be
/// a bug in the pass.
///
/// # Errors
///
/// Returns an error for invalid input, a bad configuration, or a
/// conflicting coverage global.
pub fn instrument_module(module: &mut Module, config: InstrumentConfig) -> Result<InstrumentStats> {
    verify_module(module)?;
    let stats = CoveragePass::new(config)?.run(module)?;
    verify_module(module)?;
    Ok(stats)
}

use std::path::PathBuf;

use edgecov_ir::{Linkage, Type};
use thiserror::Error;

/// Fatal configuration errors. Nothing is instrumented when one occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to open whitelist {}: {source}", path.display())]
    WhitelistUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad value of AFL_INST_RATIO {value:?} (must be between 1 and 100)")]
    BadRatio { value: String },
}

/// Errors raised while instrumenting a module.
#[derive(Debug, Error)]
pub enum PassError {
    #[error(
        "global {name} already declared as {linkage} {found}, expected external {expected}"
    )]
    ConflictingGlobal {
        name: String,
        found: Type,
        expected: Type,
        linkage: Linkage,
    },
    #[error("function {func}: no block {block} to instrument")]
    MissingBlock { func: String, block: u32 },
}

pub type Result<T> = std::result::Result<T, PassError>;

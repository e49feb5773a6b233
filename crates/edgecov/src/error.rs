use std::path::PathBuf;

use thiserror::Error;

/// Errors from the edgecov pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed module {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid module: {0}")]
    Verify(#[from] edgecov_ir::VerifyError),
    #[error(transparent)]
    Config(#[from] edgecov_pass::ConfigError),
    #[error("instrumentation failed: {0}")]
    Pass(#[from] edgecov_pass::PassError),
    #[error(transparent)]
    Map(#[from] edgecov_rt::MapError),
    #[error("execution failed: {0}")]
    Exec(#[from] edgecov_rt::ExecError),
}

pub type Result<T> = std::result::Result<T, Error>;

//! AFL-style edge coverage instrumentation.
//!
//! Every eligible basic block gets a random location id and a short
//! sequence at its entry that bumps one byte of a shared 64 KiB map:
//!
//! ```text
//! map[cur_loc ^ prev_loc]++;
//! prev_loc = cur_loc >> 1;
//! ```
//!
//! The shift keeps `A -> B` and `B -> A` apart and stops tight self-loops
//! from always landing on cell zero. Eligibility comes from an optional
//! whitelist of source filename suffixes; density comes from an
//! instrumentation ratio.

pub mod abi;
mod config;
mod encoder;
mod error;
mod globals;
mod location;
mod pass;
mod report;
mod whitelist;

pub use config::{ENV_HARDEN, ENV_INST_RATIO, ENV_QUIET, ENV_WHITELIST, InstRatio, InstrumentConfig};
pub use encoder::EdgeEncoder;
pub use error::{ConfigError, PassError, Result};
pub use globals::CoverageGlobals;
pub use location::LocationAllocator;
pub use pass::{CoveragePass, InstrumentStats, describe_metrics};
pub use report::{Reporter, Summary, VERSION, summary_line};
pub use whitelist::{DebugLocResolver, SourceLocationResolver, Whitelist};

//! The module pass: filter, admit, encode, report.

use edgecov_ir::{BlockId, Module};
use metrics::{Unit, counter, describe_counter};
use tracing::{debug, info, warn};

use crate::config::{InstRatio, InstrumentConfig};
use crate::encoder::EdgeEncoder;
use crate::error::{ConfigError, Result};
use crate::globals::CoverageGlobals;
use crate::location::LocationAllocator;
use crate::report::Reporter;
use crate::whitelist::{DebugLocResolver, SourceLocationResolver, Whitelist};

/// Counts from one run of the pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstrumentStats {
    /// Function bodies visited (declarations are skipped).
    pub functions: usize,
    /// Blocks visited.
    pub blocks_total: usize,
    /// Blocks outside the whitelist.
    pub blocks_filtered: usize,
    /// Eligible blocks dropped by the density roll.
    pub blocks_rejected: usize,
    pub blocks_instrumented: usize,
    pub ratio: InstRatio,
    pub hardened: bool,
}

/// Register metric descriptions. Call once at startup.
pub fn describe_metrics() {
    describe_counter!("edgecov_blocks_total", Unit::Count, "Basic blocks visited");
    describe_counter!(
        "edgecov_blocks_instrumented_total",
        Unit::Count,
        "Basic blocks given an edge-recording sequence"
    );
    describe_counter!(
        "edgecov_blocks_filtered_total",
        Unit::Count,
        "Basic blocks outside the whitelist"
    );
    describe_counter!(
        "edgecov_blocks_rejected_total",
        Unit::Count,
        "Eligible blocks skipped by the density ratio"
    );
}

fn record(stats: &InstrumentStats) {
    let as_u64 = |n: usize| u64::try_from(n).unwrap_or(u64::MAX);
    counter!("edgecov_blocks_total").increment(as_u64(stats.blocks_total));
    counter!("edgecov_blocks_instrumented_total").increment(as_u64(stats.blocks_instrumented));
    counter!("edgecov_blocks_filtered_total").increment(as_u64(stats.blocks_filtered));
    counter!("edgecov_blocks_rejected_total").increment(as_u64(stats.blocks_rejected));
}

/// Edge coverage instrumentation pass.
///
/// Construction loads the whitelist. A configured but unreadable whitelist
/// is fatal.
pub struct CoveragePass {
    config: InstrumentConfig,
    whitelist: Whitelist,
    resolver: Box<dyn SourceLocationResolver>,
    reporter: Reporter,
}

impl CoveragePass {
    /// Create a pass from `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::WhitelistUnreadable` if the configured
    /// whitelist cannot be read.
    pub fn new(config: InstrumentConfig) -> std::result::Result<Self, ConfigError> {
        let whitelist = match &config.whitelist {
            Some(path) => Whitelist::load(path)?,
            None => Whitelist::allow_all(),
        };
        debug!(entries = whitelist.len(), "whitelist loaded");
        Ok(Self {
            reporter: Reporter::new(config.quiet),
            config,
            whitelist,
            resolver: Box::new(DebugLocResolver),
        })
    }

    /// Create a pass from the `AFL_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error for a bad ratio or an unreadable whitelist.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::new(InstrumentConfig::from_env()?)
    }

    /// Replace the whitelist (e.g. with entries not backed by a file).
    #[must_use]
    pub fn with_whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = whitelist;
        self
    }

    /// Replace the source location resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl SourceLocationResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    #[must_use]
    pub const fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Instrument every eligible block of every function body in `module`.
    ///
    /// # Errors
    ///
    /// Returns `PassError::ConflictingGlobal` if the module already declares
    /// one of the coverage globals with an incompatible shape. The module is
    /// left untouched and nothing is printed in that case.
    pub fn run(&self, module: &mut Module) -> Result<InstrumentStats> {
        let globals = CoverageGlobals::provision(module)?;
        self.reporter.banner();
        let encoder = EdgeEncoder::new(globals);
        let mut locations = match self.config.seed {
            Some(seed) => LocationAllocator::seeded(seed, self.config.ratio),
            None => LocationAllocator::new(self.config.ratio),
        };

        let mut stats = InstrumentStats {
            ratio: self.config.ratio,
            hardened: self.config.hardened,
            ..InstrumentStats::default()
        };

        for func in module.functions.iter_mut().filter(|f| !f.is_declaration()) {
            stats.functions += 1;
            func.sync_value_numbering();
            let ids: Vec<BlockId> = func.blocks.iter().map(|b| b.id).collect();
            for id in ids {
                stats.blocks_total += 1;
                let eligible = func
                    .block(id)
                    .is_some_and(|b| self.whitelist.is_eligible(self.resolver.as_ref(), b));
                if !eligible {
                    stats.blocks_filtered += 1;
                    debug!(func = %func.name, block = %id, "not whitelisted");
                    continue;
                }
                let Some(cur_loc) = locations.admit() else {
                    stats.blocks_rejected += 1;
                    debug!(func = %func.name, block = %id, "rejected by ratio");
                    continue;
                };
                encoder.instrument(func, id, cur_loc)?;
                stats.blocks_instrumented += 1;
                debug!(func = %func.name, block = %id, cur_loc, "instrumented");
            }
        }

        record(&stats);
        if stats.blocks_instrumented == 0 {
            warn!(module = %module.name, blocks = stats.blocks_total, "no instrumentation targets found");
        } else {
            info!(
                module = %module.name,
                instrumented = stats.blocks_instrumented,
                filtered = stats.blocks_filtered,
                rejected = stats.blocks_rejected,
                ratio = stats.ratio.percent(),
                hardened = stats.hardened,
                "instrumentation complete"
            );
        }
        self.reporter.summary(&stats);
        Ok(stats)
    }
}

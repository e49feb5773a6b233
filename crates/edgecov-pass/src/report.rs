//! Operator-facing banner and summary.

use std::sync::Arc;

use console::{StyledObject, Term, style};
use parking_lot::Mutex;

use crate::pass::InstrumentStats;

/// Crate version, shown in the banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Debug)]
enum Sink {
    Stderr,
    Silent,
    Buffer(Arc<Mutex<Vec<String>>>),
}

/// Writes the banner and summary to stderr.
///
/// Silent in quiet mode and whenever stderr is not a terminal, so build
/// logs of non-interactive compiles stay clean.
#[derive(Clone, Debug)]
pub struct Reporter {
    sink: Sink,
}

impl Reporter {
    /// Reporter honouring `quiet` and the terminal check.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let sink = if !quiet && Term::stderr().is_term() {
            Sink::Stderr
        } else {
            Sink::Silent
        };
        Self { sink }
    }

    /// Reporter that never prints.
    #[must_use]
    pub const fn silent() -> Self {
        Self { sink: Sink::Silent }
    }

    /// Reporter that keeps unstyled lines in memory instead of printing.
    /// Clones share the buffer.
    #[must_use]
    pub fn buffered() -> Self {
        Self {
            sink: Sink::Buffer(Arc::default()),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self.sink, Sink::Silent)
    }

    /// Lines captured by a buffered reporter.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Buffer(lines) => lines.lock().clone(),
            _ => Vec::new(),
        }
    }

    fn emit<'a>(
        &self,
        tag: &'a str,
        paint: fn(StyledObject<&'a str>) -> StyledObject<&'a str>,
        msg: &str,
    ) {
        match &self.sink {
            Sink::Stderr => eprintln!("{} {msg}", paint(style(tag))),
            Sink::Silent => {}
            Sink::Buffer(lines) => lines.lock().push(format!("{tag} {msg}")),
        }
    }

    pub fn banner(&self) {
        self.emit("edgecov-pass", |s| s.cyan(), VERSION);
    }

    pub fn summary(&self, stats: &InstrumentStats) {
        match summary_line(stats) {
            Summary::Nothing(msg) => self.emit("[!] WARNING:", |s| s.yellow().bold(), &msg),
            Summary::Instrumented(msg) => self.emit("[+]", |s| s.green().bold(), &msg),
        }
    }
}

/// Outcome of a pass, as shown to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Summary {
    /// Nothing was instrumented.
    Nothing(String),
    Instrumented(String),
}

/// Render the summary for `stats`.
#[must_use]
pub fn summary_line(stats: &InstrumentStats) -> Summary {
    if stats.blocks_instrumented == 0 {
        return Summary::Nothing("No instrumentation targets found.".to_string());
    }
    let mode = if stats.hardened {
        "hardened"
    } else {
        "non-hardened"
    };
    Summary::Instrumented(format!(
        "Instrumented {} locations ({mode} mode, ratio {}).",
        stats.blocks_instrumented, stats.ratio
    ))
}

//! Metrics collection and reporting using metrics-rs.
//!
//! The pass records block counters through the `metrics` facade; the CLI
//! installs [`MetricsRecorder`] with `--metrics` and prints what was recorded.

use std::collections::BTreeMap;
use std::sync::Arc;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    describe_gauge, gauge,
};
use parking_lot::RwLock;

use crate::CoverageMap;

/// Register metric descriptions. Call once at startup.
pub fn init() {
    edgecov_pass::describe_metrics();
    describe_gauge!(
        "edgecov_edges_hit",
        Unit::Count,
        "Coverage map cells hit by the last run"
    );
    describe_gauge!(
        "edgecov_run_steps",
        Unit::Count,
        "Interpreter steps taken by the last run"
    );
}

/// Record coverage after a run.
#[allow(clippy::cast_precision_loss)]
pub fn record_run(map: &CoverageMap, steps: u64) {
    gauge!("edgecov_edges_hit").set(map.count_nonzero() as f64);
    gauge!("edgecov_run_steps").set(steps as f64);
}

/// Last value seen for one metric name.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Sample {
    Count(u64),
    Level(f64),
}

type Samples = Arc<RwLock<BTreeMap<String, Sample>>>;

/// Recorder cell for one metric. Labels are ignored; edgecov emits none.
struct Slot {
    name: String,
    samples: Samples,
}

impl Slot {
    fn update(&self, f: impl FnOnce(Option<Sample>) -> Sample) {
        let mut samples = self.samples.write();
        let next = f(samples.get(&self.name).copied());
        samples.insert(self.name.clone(), next);
    }

    fn level(&self, f: impl FnOnce(f64) -> f64) {
        self.update(|prev| match prev {
            Some(Sample::Level(v)) => Sample::Level(f(v)),
            _ => Sample::Level(f(0.0)),
        });
    }
}

impl metrics::CounterFn for Slot {
    fn increment(&self, value: u64) {
        self.update(|prev| match prev {
            Some(Sample::Count(n)) => Sample::Count(n.saturating_add(value)),
            _ => Sample::Count(value),
        });
    }

    fn absolute(&self, value: u64) {
        self.update(|_| Sample::Count(value));
    }
}

impl metrics::GaugeFn for Slot {
    fn increment(&self, value: f64) {
        self.level(|v| v + value);
    }

    fn decrement(&self, value: f64) {
        self.level(|v| v - value);
    }

    fn set(&self, value: f64) {
        self.level(|_| value);
    }
}

/// Keeps the pass counters and run gauges for the `--metrics` summary.
///
/// Histograms are not used by edgecov and are dropped.
#[derive(Default)]
pub struct MetricsRecorder {
    samples: Samples,
}

impl MetricsRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn handle(&self) -> MetricsHandle {
        MetricsHandle {
            samples: Arc::clone(&self.samples),
        }
    }

    /// Install as the global recorder. `None` if one is already installed.
    #[must_use]
    pub fn install(self) -> Option<MetricsHandle> {
        let handle = self.handle();
        metrics::set_global_recorder(self).ok()?;
        Some(handle)
    }

    fn slot(&self, key: &Key) -> Arc<Slot> {
        Arc::new(Slot {
            name: key.name().to_string(),
            samples: Arc::clone(&self.samples),
        })
    }
}

impl Recorder for MetricsRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.slot(key))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.slot(key))
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

/// Read side of a [`MetricsRecorder`].
pub struct MetricsHandle {
    samples: Samples,
}

impl MetricsHandle {
    #[must_use]
    pub fn get_counter(&self, name: &str) -> Option<u64> {
        match self.samples.read().get(name) {
            Some(Sample::Count(n)) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_gauge(&self, name: &str) -> Option<f64> {
        match self.samples.read().get(name) {
            Some(Sample::Level(v)) => Some(*v),
            _ => None,
        }
    }

    /// One `name value` line per metric, ordered by name.
    #[must_use]
    pub fn render(&self) -> String {
        let samples = self.samples.read();
        if samples.is_empty() {
            return "No metrics collected.\n".to_string();
        }
        let width = samples.keys().map(String::len).max().unwrap_or(0);
        let mut out = String::from("## Metrics Summary\n");
        for (name, sample) in &*samples {
            let value = match sample {
                Sample::Count(n) => n.to_string(),
                Sample::Level(v) => v.to_string(),
            };
            out.push_str(&format!("  {name:<width$}  {value}\n"));
        }
        out
    }

    pub fn print_summary(&self) {
        print!("\n{}", self.render());
    }
}

#[cfg(test)]
mod tests {
    use edgecov_ir::{Function, IRBuilder, Module, Terminator};

    use super::*;
    use crate::{InstrumentConfig, instrument_module};

    #[test]
    fn test_pass_counters_reach_recorder() {
        let mut m = Module::new("m");
        let mut f = Function::new("f", vec![], None);
        let a = f.add_block("a");
        let b = f.add_block("b");
        IRBuilder::at_end(&mut f, a)
            .expect("a")
            .terminate(Terminator::br(b));
        IRBuilder::at_end(&mut f, b)
            .expect("b")
            .terminate(Terminator::ret(None));
        m.add_function(f);

        let recorder = MetricsRecorder::new();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            instrument_module(&mut m, InstrumentConfig::new().with_quiet(true))
                .expect("instrument");
        });

        assert_eq!(handle.get_counter("edgecov_blocks_total"), Some(2));
        assert_eq!(handle.get_counter("edgecov_blocks_instrumented_total"), Some(2));
        assert_eq!(handle.get_counter("edgecov_blocks_filtered_total"), Some(0));
    }

    #[test]
    fn test_run_gauges() {
        let recorder = MetricsRecorder::new();
        let handle = recorder.handle();
        let map = CoverageMap::default();
        metrics::with_local_recorder(&recorder, || record_run(&map, 42));
        assert_eq!(handle.get_gauge("edgecov_edges_hit"), Some(0.0));
        assert_eq!(handle.get_gauge("edgecov_run_steps"), Some(42.0));
        assert_eq!(handle.get_counter("edgecov_run_steps"), None);
    }

    #[test]
    fn test_render_orders_by_name() {
        let recorder = MetricsRecorder::new();
        let handle = recorder.handle();
        assert_eq!(handle.render(), "No metrics collected.\n");

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("edgecov_blocks_total").increment(3);
            metrics::counter!("edgecov_blocks_total").increment(2);
            metrics::gauge!("edgecov_edges_hit").set(7.0);
        });
        assert_eq!(
            handle.render(),
            "## Metrics Summary\n  edgecov_blocks_total  5\n  edgecov_edges_hit     7\n"
        );
    }
}

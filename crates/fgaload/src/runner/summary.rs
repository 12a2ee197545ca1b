//! End-of-run summary.

use std::fmt;

use fgaload_client::{AssertionSummary, BatchReport, Iteration, SetupReport};
use hdrhistogram::{AdditionError, CreationError, Histogram};
use serde::Serialize;

/// Slowest latency tracked, in microseconds. Slower iterations saturate here.
const MAX_TRACKED_MICROS: u64 = 3_600_000_000;

const SIGNIFICANT_FIGURES: u8 = 3;

#[derive(Debug, thiserror::Error)]
pub enum HistogramError {
    #[error(transparent)]
    Create(#[from] CreationError),

    #[error(transparent)]
    Merge(#[from] AdditionError),
}

/// Latency distribution over all iterations, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    /// `None` for an empty histogram. Expects microsecond values.
    pub fn from_histogram(histogram: &Histogram<u64>) -> Option<Self> {
        if histogram.is_empty() {
            return None;
        }
        let quantile = |q: f64| millis(histogram.value_at_quantile(q));

        Some(Self {
            min_ms: millis(histogram.min()),
            mean_ms: histogram.mean() / 1000.0,
            p50_ms: quantile(0.50),
            p90_ms: quantile(0.90),
            p95_ms: quantile(0.95),
            p99_ms: quantile(0.99),
            max_ms: millis(histogram.max()),
        })
    }
}

fn millis(micros: u64) -> f64 {
    micros as f64 / 1000.0
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub scenario: String,
    pub vus: usize,
    pub seed: u64,
    /// Wall time of the probe phase.
    pub elapsed_secs: f64,
    pub iterations: u64,
    pub failed_iterations: u64,
    pub iterations_per_sec: f64,
    pub latency: Option<LatencyStats>,
    pub setup: SetupReport,
    /// `None` when teardown was disabled or timed out.
    pub teardown: Option<BatchReport>,
    pub assertions: Vec<AssertionSummary>,
}

impl RunSummary {
    /// Total assertion failures across setup, probes and teardown.
    pub fn assertion_failures(&self) -> u64 {
        self.assertions.iter().map(|a| a.failed).sum()
    }
}

/// Iteration count, failures and a bounded latency histogram.
///
/// One per virtual user, merged at the end of the probe phase.
#[derive(Debug)]
pub(crate) struct IterationTally {
    latencies: Histogram<u64>,
    failed: u64,
}

impl IterationTally {
    pub(crate) fn new() -> Result<Self, HistogramError> {
        Ok(Self {
            latencies: Histogram::new_with_bounds(1, MAX_TRACKED_MICROS, SIGNIFICANT_FIGURES)?,
            failed: 0,
        })
    }

    pub(crate) fn record(&mut self, iteration: &Iteration) {
        if !iteration.passed {
            self.failed += 1;
        }
        let micros = u64::try_from(iteration.latency.as_micros()).unwrap_or(u64::MAX);
        self.latencies.saturating_record(micros);
    }

    pub(crate) fn merge(&mut self, other: &IterationTally) -> Result<(), HistogramError> {
        self.latencies.add(&other.latencies)?;
        self.failed += other.failed;
        Ok(())
    }

    pub(crate) fn iterations(&self) -> u64 {
        self.latencies.len()
    }

    pub(crate) fn failed(&self) -> u64 {
        self.failed
    }

    pub(crate) fn latency(&self) -> Option<LatencyStats> {
        LatencyStats::from_histogram(&self.latencies)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "run {} ({}, {} vus, seed {})", self.run_id, self.scenario, self.vus, self.seed)?;
        writeln!(
            f,
            "  setup ........: model {}, {}/{} write batches ok",
            self.setup.model_id.as_deref().unwrap_or("<none>"),
            self.setup.writes.succeeded,
            self.setup.writes.batches
        )?;
        writeln!(
            f,
            "  iterations ...: {} ({} failed) in {:.1}s, {:.2}/s",
            self.iterations, self.failed_iterations, self.elapsed_secs, self.iterations_per_sec
        )?;
        if let Some(l) = &self.latency {
            writeln!(
                f,
                "  latency ......: min={:.2}ms avg={:.2}ms p50={:.2}ms p90={:.2}ms p95={:.2}ms p99={:.2}ms max={:.2}ms",
                l.min_ms, l.mean_ms, l.p50_ms, l.p90_ms, l.p95_ms, l.p99_ms, l.max_ms
            )?;
        }
        match &self.teardown {
            Some(report) => writeln!(
                f,
                "  teardown .....: {}/{} delete batches ok",
                report.succeeded, report.batches
            )?,
            None => writeln!(f, "  teardown .....: skipped")?,
        }
        writeln!(f, "  assertions:")?;
        for assertion in &self.assertions {
            writeln!(
                f,
                "    {:<50} {:>6.2}%  ✓ {}  ✗ {}",
                assertion.name,
                assertion.pass_rate() * 100.0,
                assertion.passed,
                assertion.failed
            )?;
        }
        Ok(())
    }
}

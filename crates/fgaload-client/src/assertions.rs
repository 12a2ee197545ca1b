//! Named pass/fail assertions.
//!
//! An assertion failure never aborts the run: it is counted, logged by the
//! caller, and the next request goes out.

use dashmap::DashMap;
use serde::Serialize;

use crate::telemetry::ASSERTIONS_TOTAL;

/// Model creation returned 201.
pub const MODEL_CREATED: &str = "write model response code was 201";
/// Model creation body carried `authorization_model_id`.
pub const MODEL_ID_RETURNED: &str = "write model response has authorization_model_id";
/// A write batch returned 200.
pub const WRITE_OK: &str = "write response was 200";
/// A delete batch returned 200.
pub const DELETE_OK: &str = "delete response was 200";
/// A check returned 200.
pub const CHECK_OK: &str = "check response code was 200";
/// A check returned `allowed: true`.
pub const CHECK_ALLOWED: &str = "allowed is true";

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    passed: u64,
    failed: u64,
}

/// Pass/fail counts for one assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionSummary {
    pub name: String,
    pub passed: u64,
    pub failed: u64,
}

impl AssertionSummary {
    /// Fraction of evaluations that passed, 1.0 when never evaluated.
    pub fn pass_rate(&self) -> f64 {
        let total = self.passed + self.failed;
        if total == 0 {
            1.0
        } else {
            self.passed as f64 / total as f64
        }
    }
}

/// Concurrent tally of assertion results, shared by all workers.
#[derive(Debug, Default)]
pub struct AssertionRecorder {
    tallies: DashMap<&'static str, Tally>,
}

impl AssertionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one evaluation of `name` and returns `passed`.
    pub fn record(&self, name: &'static str, passed: bool) -> bool {
        {
            let mut tally = self.tallies.entry(name).or_default();
            if passed {
                tally.passed += 1;
            } else {
                tally.failed += 1;
            }
        }

        let result = if passed { "pass" } else { "fail" };
        metrics::counter!(ASSERTIONS_TOTAL, "name" => name, "result" => result).increment(1);

        passed
    }

    /// Counts for `name`, if it was ever evaluated.
    pub fn get(&self, name: &str) -> Option<AssertionSummary> {
        self.tallies.get(name).map(|entry| AssertionSummary {
            name: entry.key().to_string(),
            passed: entry.passed,
            failed: entry.failed,
        })
    }

    /// Counts for every assertion, sorted by name.
    pub fn snapshot(&self) -> Vec<AssertionSummary> {
        let mut summaries: Vec<AssertionSummary> = self
            .tallies
            .iter()
            .map(|entry| AssertionSummary {
                name: entry.key().to_string(),
                passed: entry.passed,
                failed: entry.failed,
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Total failures across all assertions.
    pub fn failures(&self) -> u64 {
        self.tallies.iter().map(|entry| entry.failed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_counts_pass_and_fail() {
        let recorder = AssertionRecorder::new();
        assert!(recorder.record(CHECK_OK, true));
        assert!(!recorder.record(CHECK_OK, false));
        recorder.record(CHECK_OK, true);

        let summary = recorder.get(CHECK_OK).unwrap();
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(recorder.failures(), 1);
    }

    #[test]
    fn test_unknown_assertion_is_none() {
        let recorder = AssertionRecorder::new();
        assert!(recorder.get(WRITE_OK).is_none());
        assert_eq!(recorder.failures(), 0);
    }

    #[test]
    fn test_snapshot_sorted_by_name() {
        let recorder = AssertionRecorder::new();
        recorder.record(WRITE_OK, true);
        recorder.record(CHECK_ALLOWED, false);
        recorder.record(MODEL_CREATED, true);

        let names: Vec<String> = recorder.snapshot().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![CHECK_ALLOWED, MODEL_CREATED, WRITE_OK]
        );
    }

    #[test]
    fn test_pass_rate() {
        let summary = AssertionSummary {
            name: CHECK_OK.to_string(),
            passed: 3,
            failed: 1,
        };
        assert!((summary.pass_rate() - 0.75).abs() < f64::EPSILON);

        let empty = AssertionSummary {
            name: CHECK_OK.to_string(),
            passed: 0,
            failed: 0,
        };
        assert!((empty.pass_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_recording() {
        let recorder = Arc::new(AssertionRecorder::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let recorder = Arc::clone(&recorder);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        recorder.record(CHECK_OK, i % 2 == 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = recorder.get(CHECK_OK).unwrap();
        assert_eq!(summary.passed, 4000);
        assert_eq!(summary.failed, 4000);
    }
}

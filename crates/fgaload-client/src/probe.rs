//! The check probe driver.
//!
//! One call to [`ProbeDriver::iterate`] is one iteration of a virtual user:
//! pick a probe uniformly at random, check it, record the two assertions.
//! The workload is shared read-only between all drivers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fgaload_graph::Workload;
use rand::Rng;
use tracing::warn;

use crate::assertions::{AssertionRecorder, CHECK_ALLOWED, CHECK_OK};
use crate::client::FgaClient;
use crate::telemetry::CHECK_DURATION_SECONDS;

/// Result of one probe iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iteration {
    /// Time until the response body was read (or the request failed).
    pub latency: Duration,
    /// Both assertions passed.
    pub passed: bool,
}

/// Issues check probes from a shared workload.
#[derive(Clone)]
pub struct ProbeDriver {
    client: Arc<FgaClient>,
    workload: Arc<Workload>,
    recorder: Arc<AssertionRecorder>,
    model_id: Option<String>,
}

impl ProbeDriver {
    pub fn new(
        client: Arc<FgaClient>,
        workload: Arc<Workload>,
        recorder: Arc<AssertionRecorder>,
        model_id: Option<String>,
    ) -> Self {
        Self {
            client,
            workload,
            recorder,
            model_id,
        }
    }

    /// Runs one iteration. `None` when the workload has no probes.
    pub async fn iterate<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Iteration> {
        let probe = self.workload.sample_probe(rng)?;

        let start = Instant::now();
        let iteration = match self.client.check(probe, self.model_id.as_deref()).await {
            Ok(outcome) => {
                let status_ok = self.recorder.record(CHECK_OK, outcome.status.as_u16() == 200);
                let allowed = self
                    .recorder
                    .record(CHECK_ALLOWED, outcome.allowed == Some(true));
                if !allowed {
                    warn!(
                        probe = %probe,
                        status = outcome.status.as_u16(),
                        allowed = ?outcome.allowed,
                        "check not allowed"
                    );
                }
                Iteration {
                    latency: outcome.latency,
                    passed: status_ok && allowed,
                }
            }
            Err(err) => {
                self.recorder.record(CHECK_OK, false);
                self.recorder.record(CHECK_ALLOWED, false);
                warn!(probe = %probe, error = %err, "check request failed");
                Iteration {
                    latency: start.elapsed(),
                    passed: false,
                }
            }
        };

        metrics::histogram!(CHECK_DURATION_SECONDS).record(iteration.latency.as_secs_f64());
        Some(iteration)
    }
}

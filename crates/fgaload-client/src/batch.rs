//! Retry-free batch submission for tuple writes and deletes.
//!
//! Tuples are chunked into fixed-size batches. A failed batch is logged,
//! recorded as a failed assertion and skipped. A rate-limit signal on a
//! response triggers the [`Throttle`] hook before the next batch; nothing is
//! ever resent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fgaload_graph::TupleKey;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assertions::{AssertionRecorder, DELETE_OK, WRITE_OK};
use crate::client::{FgaClient, WriteOutcome, WriteRequest};
use crate::error::ClientResult;
use crate::telemetry::THROTTLE_PAUSES_TOTAL;

/// Default number of tuples per write or delete request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Pause hook invoked after a response signals an exhausted quota.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}

/// Sleeps for a fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct FixedPause {
    duration: Duration,
}

impl FixedPause {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Default for FixedPause {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl Throttle for FixedPause {
    async fn pause(&self) {
        tokio::time::sleep(self.duration).await;
    }
}

/// Ignores rate-limit signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPause;

#[async_trait]
impl Throttle for NoPause {
    async fn pause(&self) {}
}

/// How batches are sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// One batch in flight at a time; the throttle is honored between batches.
    #[default]
    Sequential,
    /// Every batch in flight at once; rate-limit signals are only counted.
    Concurrent,
}

/// Direction of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOp {
    Write,
    Delete,
}

impl BatchOp {
    fn assertion(self) -> &'static str {
        match self {
            BatchOp::Write => WRITE_OK,
            BatchOp::Delete => DELETE_OK,
        }
    }

    fn request<'a>(self, tuples: &'a [TupleKey], model_id: Option<&'a str>) -> WriteRequest<'a> {
        match self {
            BatchOp::Write => WriteRequest::writes(tuples, model_id),
            BatchOp::Delete => WriteRequest::deletes(tuples, model_id),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchOp::Write => "write",
            BatchOp::Delete => "delete",
        }
    }
}

/// Outcome of submitting a tuple set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub batches: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub tuples: usize,
    /// Responses that reported an exhausted quota.
    pub throttled: usize,
}

/// Chunks tuple sets and submits them.
#[derive(Clone)]
pub struct BatchSubmitter {
    client: Arc<FgaClient>,
    recorder: Arc<AssertionRecorder>,
    throttle: Arc<dyn Throttle>,
    batch_size: usize,
    mode: BatchMode,
}

impl BatchSubmitter {
    /// Creates a sequential submitter with the default batch size and a
    /// one-second throttle.
    pub fn new(client: Arc<FgaClient>, recorder: Arc<AssertionRecorder>) -> Self {
        Self {
            client,
            recorder,
            throttle: Arc::new(FixedPause::default()),
            batch_size: DEFAULT_BATCH_SIZE,
            mode: BatchMode::default(),
        }
    }

    /// Sets the number of tuples per request. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_mode(mut self, mode: BatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn client(&self) -> &FgaClient {
        &self.client
    }

    pub fn recorder(&self) -> &AssertionRecorder {
        &self.recorder
    }

    /// Submits `tuples` in batches. Never fails; see the returned report.
    pub async fn submit(
        &self,
        op: BatchOp,
        tuples: &[TupleKey],
        model_id: Option<&str>,
    ) -> BatchReport {
        let batches: Vec<&[TupleKey]> = tuples.chunks(self.batch_size).collect();
        let mut report = BatchReport {
            batches: batches.len(),
            tuples: tuples.len(),
            ..BatchReport::default()
        };

        info!(
            op = op.as_str(),
            tuples = tuples.len(),
            batches = batches.len(),
            mode = ?self.mode,
            "submitting tuple batches"
        );

        match self.mode {
            BatchMode::Sequential => {
                let last = batches.len().saturating_sub(1);
                for (index, batch) in batches.iter().enumerate() {
                    let result = self.client.write(&op.request(batch, model_id)).await;
                    let throttled = self.settle(op, index, &mut report, result);
                    if throttled && index < last {
                        debug!(op = op.as_str(), batch = index, "quota exhausted, pausing");
                        metrics::counter!(THROTTLE_PAUSES_TOTAL).increment(1);
                        self.throttle.pause().await;
                    }
                }
            }
            BatchMode::Concurrent => {
                let results = join_all(
                    batches
                        .iter()
                        .map(|batch| async move { self.client.write(&op.request(batch, model_id)).await }),
                )
                .await;
                for (index, result) in results.into_iter().enumerate() {
                    self.settle(op, index, &mut report, result);
                }
            }
        }

        info!(
            op = op.as_str(),
            succeeded = report.succeeded,
            failed = report.failed,
            throttled = report.throttled,
            "tuple batches submitted"
        );

        report
    }

    /// Records one batch result. Returns whether the quota is exhausted.
    fn settle(
        &self,
        op: BatchOp,
        index: usize,
        report: &mut BatchReport,
        result: ClientResult<WriteOutcome>,
    ) -> bool {
        match result {
            Ok(outcome) => {
                let ok = self
                    .recorder
                    .record(op.assertion(), outcome.status.as_u16() == 200);
                if ok {
                    report.succeeded += 1;
                } else {
                    report.failed += 1;
                    warn!(
                        op = op.as_str(),
                        batch = index,
                        status = outcome.status.as_u16(),
                        body = %outcome.body,
                        "failed to {} tuples",
                        op.as_str()
                    );
                }
                if outcome.rate_limited {
                    report.throttled += 1;
                }
                outcome.rate_limited
            }
            Err(err) => {
                self.recorder.record(op.assertion(), false);
                report.failed += 1;
                warn!(op = op.as_str(), batch = index, error = %err, "batch request failed");
                false
            }
        }
    }
}

//! Setup and teardown against the service.
//!
//! Setup writes the authorization model, then the workload's tuples. Teardown
//! deletes the same tuples. Both are best effort: failures are recorded and
//! logged, never retried, and never stop the run.

use fgaload_graph::{TupleKey, Workload};
use serde::Serialize;
use tracing::{info, warn};

use crate::assertions::{MODEL_CREATED, MODEL_ID_RETURNED};
use crate::batch::{BatchOp, BatchReport, BatchSubmitter};

/// What setup achieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupReport {
    /// Model id returned by the service; `None` if model creation failed.
    pub model_id: Option<String>,
    pub writes: BatchReport,
}

/// Writes the authorization model and every workload tuple.
///
/// Tuple writes go ahead even if the model could not be created; they then
/// carry no model id and the service resolves its latest model.
pub async fn bootstrap(submitter: &BatchSubmitter, workload: &Workload) -> SetupReport {
    let model_id = write_model(submitter).await;
    let writes = submitter
        .submit(BatchOp::Write, workload.tuples(), model_id.as_deref())
        .await;

    SetupReport { model_id, writes }
}

async fn write_model(submitter: &BatchSubmitter) -> Option<String> {
    let recorder = submitter.recorder();

    let outcome = match submitter.client().write_model().await {
        Ok(outcome) => outcome,
        Err(err) => {
            recorder.record(MODEL_CREATED, false);
            warn!(error = %err, "failed to write authorization model");
            return None;
        }
    };

    if !recorder.record(MODEL_CREATED, outcome.status.as_u16() == 201) {
        warn!(
            status = outcome.status.as_u16(),
            body = %outcome.body,
            "unexpected status writing authorization model"
        );
    }

    if !recorder.record(MODEL_ID_RETURNED, outcome.model_id.is_some()) {
        warn!(body = %outcome.body, "authorization model response has no model id");
    }

    if let Some(model_id) = &outcome.model_id {
        info!(model_id = %model_id, "authorization model written");
    }

    outcome.model_id
}

/// Deletes previously written tuples.
pub async fn teardown(
    submitter: &BatchSubmitter,
    tuples: &[TupleKey],
    model_id: Option<&str>,
) -> BatchReport {
    submitter.submit(BatchOp::Delete, tuples, model_id).await
}

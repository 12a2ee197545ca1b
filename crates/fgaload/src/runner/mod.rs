//! Run orchestration: setup, probe phase, teardown.
//!
//! ```text
//! build workload ──► bootstrap (setup timeout) ──► N VU tasks until deadline
//!                                                        │
//!                      summary ◄── teardown (teardown timeout, optional)
//! ```

mod summary;

pub use summary::{HistogramError, LatencyStats, RunSummary};

use std::sync::Arc;
use std::time::Duration;

use fgaload_client::{
    bootstrap, teardown, AssertionRecorder, BatchReport, BatchSubmitter, ClientError, FgaClient,
    ProbeDriver,
};
use fgaload_graph::Workload;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{timeout, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{ConfigLoadError, LoadTestConfig};
use crate::scenario::Profile;
use summary::IterationTally;

/// Fatal run errors. Assertion failures are not errors.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("setup did not finish within {0:?}")]
    SetupTimeout(Duration),

    #[error("latency histogram: {0}")]
    Histogram(#[from] HistogramError),
}

/// A generated workload and the seed that reproduces it.
#[derive(Debug, Clone)]
pub struct Plan {
    pub seed: u64,
    pub workload: Workload,
}

/// Generates the workload for the configured graph size.
///
/// Uses the configured seed, or draws one so the run can be reproduced.
pub fn plan(config: &LoadTestConfig) -> Plan {
    let seed = config
        .workload
        .seed
        .unwrap_or_else(|| rand::thread_rng().gen());
    let workload = Workload::generate(config.graph_size(), &mut StdRng::seed_from_u64(seed));

    let stats = workload.stats();
    info!(
        seed,
        users = stats.users,
        orgs = stats.orgs,
        teams = stats.teams,
        tuples = stats.total_tuples,
        probes = stats.total_probes,
        "workload generated"
    );

    Plan { seed, workload }
}

/// Runs one complete load test.
pub async fn run(
    config: &LoadTestConfig,
    profile: Profile,
    teardown_enabled: bool,
) -> Result<RunSummary, RunError> {
    let run_id = Uuid::new_v4().to_string();
    let span = info_span!("run", %run_id, scenario = %profile.scenario);
    execute(config, profile, teardown_enabled, run_id)
        .instrument(span)
        .await
}

async fn execute(
    config: &LoadTestConfig,
    profile: Profile,
    teardown_enabled: bool,
    run_id: String,
) -> Result<RunSummary, RunError> {
    let client = Arc::new(FgaClient::new(config.client_config()?)?);
    let Plan { seed, workload } = plan(config);
    let workload = Arc::new(workload);
    let recorder = Arc::new(AssertionRecorder::new());
    let submitter = BatchSubmitter::new(Arc::clone(&client), Arc::clone(&recorder))
        .with_batch_size(config.workload.tuples_per_write)
        .with_mode(profile.write_mode);

    info!(
        base_uri = %client.config().base_uri,
        store_id = %client.config().store_id,
        vus = profile.vus,
        duration_secs = profile.duration.as_secs(),
        "starting setup"
    );
    let setup = match timeout(config.setup_timeout(), bootstrap(&submitter, &workload)).await {
        Ok(setup) => setup,
        Err(_) => {
            warn!(
                timeout_secs = config.setup_timeout().as_secs(),
                "setup did not finish in time"
            );
            // Batches written before the deadline are already persisted.
            if teardown_enabled {
                timed_teardown(config, &submitter, &workload, None).await;
            }
            return Err(RunError::SetupTimeout(config.setup_timeout()));
        }
    };
    info!(
        model_id = setup.model_id.as_deref().unwrap_or("<none>"),
        batches = setup.writes.batches,
        failed = setup.writes.failed,
        "setup complete"
    );

    let driver = ProbeDriver::new(
        Arc::clone(&client),
        Arc::clone(&workload),
        Arc::clone(&recorder),
        setup.model_id.clone(),
    );
    let started = Instant::now();
    let tally = probe_phase(driver, profile, seed, workload.probes().is_empty()).await?;
    let elapsed = started.elapsed();

    let teardown_report = if teardown_enabled {
        timed_teardown(config, &submitter, &workload, setup.model_id.as_deref()).await
    } else {
        info!("teardown disabled, leaving tuples in place");
        None
    };

    let elapsed_secs = elapsed.as_secs_f64();
    let iterations = tally.iterations();
    let summary = RunSummary {
        run_id,
        scenario: profile.scenario.to_string(),
        vus: profile.vus,
        seed,
        elapsed_secs,
        iterations,
        failed_iterations: tally.failed(),
        iterations_per_sec: if elapsed_secs > 0.0 {
            iterations as f64 / elapsed_secs
        } else {
            0.0
        },
        latency: tally.latency(),
        setup,
        teardown: teardown_report,
        assertions: recorder.snapshot(),
    };

    info!(
        iterations = summary.iterations,
        failed_iterations = summary.failed_iterations,
        iterations_per_sec = summary.iterations_per_sec,
        p95_ms = summary.latency.map(|l| l.p95_ms),
        assertion_failures = summary.assertion_failures(),
        "run complete"
    );

    Ok(summary)
}

/// Deletes the workload's tuples. `None` when the teardown timeout expires.
async fn timed_teardown(
    config: &LoadTestConfig,
    submitter: &BatchSubmitter,
    workload: &Workload,
    model_id: Option<&str>,
) -> Option<BatchReport> {
    match timeout(
        config.teardown_timeout(),
        teardown(submitter, workload.tuples(), model_id),
    )
    .await
    {
        Ok(report) => Some(report),
        Err(_) => {
            warn!(
                timeout_secs = config.teardown_timeout().as_secs(),
                "teardown did not finish in time"
            );
            None
        }
    }
}

/// Spawns `profile.vus` workers looping the driver until the deadline.
///
/// Each worker keeps its own tally; they are merged once all have finished.
async fn probe_phase(
    driver: ProbeDriver,
    profile: Profile,
    seed: u64,
    no_probes: bool,
) -> Result<IterationTally, RunError> {
    let mut tally = IterationTally::new()?;
    if no_probes {
        warn!("workload has no probes, skipping probe phase");
        return Ok(tally);
    }

    let deadline = Instant::now() + profile.duration;
    let mut workers = Vec::with_capacity(profile.vus);
    for vu in 0..profile.vus {
        let driver = driver.clone();
        let rng = StdRng::seed_from_u64(seed.wrapping_add(vu as u64 + 1));
        let vu_tally = IterationTally::new()?;
        workers.push(tokio::spawn(
            vu_loop(driver, rng, deadline, vu_tally).instrument(info_span!("vu", vu)),
        ));
    }

    for worker in workers {
        match worker.await {
            Ok(vu_tally) => tally.merge(&vu_tally)?,
            Err(err) => warn!(error = %err, "virtual user task failed"),
        }
    }

    Ok(tally)
}

async fn vu_loop(
    driver: ProbeDriver,
    mut rng: StdRng,
    deadline: Instant,
    mut tally: IterationTally,
) -> IterationTally {
    while Instant::now() < deadline {
        match driver.iterate(&mut rng).await {
            Some(iteration) => tally.record(&iteration),
            None => break,
        }
    }
    tally
}

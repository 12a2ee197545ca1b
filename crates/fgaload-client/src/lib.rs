//! fgaload-client: Traffic against an OpenFGA-compatible HTTP API
//!
//! This crate contains everything that talks to the service under test:
//! - Typed HTTP client for model, write, delete and check endpoints
//! - Retry-free batch submission with rate-limit throttling
//! - Named pass/fail assertions shared across workers
//! - Setup (model + tuple writes), teardown (tuple deletes)
//! - The probe driver issuing one check per iteration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               fgaload-client                 │
//! ├─────────────────────────────────────────────┤
//! │  client.rs     - reqwest client, payloads   │
//! │  batch.rs      - Batch submitter, throttle  │
//! │  assertions.rs - Pass/fail tallies          │
//! │  bootstrap.rs  - Setup and teardown         │
//! │  probe.rs      - Check probe driver         │
//! │  telemetry.rs  - Metric names               │
//! └─────────────────────────────────────────────┘
//! ```

pub mod assertions;
pub mod batch;
pub mod bootstrap;
pub mod client;
pub mod error;
pub mod probe;
pub mod telemetry;

// Re-exports for convenience
pub use assertions::{AssertionRecorder, AssertionSummary};
pub use batch::{BatchMode, BatchOp, BatchReport, BatchSubmitter, FixedPause, NoPause, Throttle};
pub use bootstrap::{bootstrap, teardown, SetupReport};
pub use client::{ClientConfig, FgaClient};
pub use error::{ClientError, ClientResult};
pub use probe::{Iteration, ProbeDriver};

//! fgaload: Load tester for OpenFGA-compatible authorization services
//!
//! Generates a synthetic org/team/repo permission graph, writes it to a
//! store, hammers the check endpoint from concurrent virtual users and
//! removes the tuples again.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  fgaload                     │
//! ├─────────────────────────────────────────────┤
//! │  config.rs        - Layered configuration   │
//! │  scenario.rs      - Named run profiles      │
//! │  runner/          - Setup, VUs, teardown    │
//! │  observability/   - Logging, Prometheus     │
//! ├─────────────────────────────────────────────┤
//! │  fgaload-client   - HTTP, batches, probes   │
//! │  fgaload-graph    - Graph and workload      │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod observability;
pub mod runner;
pub mod scenario;

pub use config::{ConfigLoadError, LoadTestConfig};
pub use runner::{plan, run, Plan, RunError, RunSummary};
pub use scenario::{Profile, Scenario};

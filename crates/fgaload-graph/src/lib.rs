//! fgaload-graph: Synthetic authorization graph generation
//!
//! This crate builds the permission graph a load test runs against:
//! - Identifier generation for users, repos, orgs and teams
//! - Randomized org/team/repo graph construction
//! - Derivation of the tuples to write and the checks to issue
//! - The fixed authorization model the tuples are written against
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               fgaload-graph                  │
//! ├─────────────────────────────────────────────┤
//! │  ids.rs      - Identifier generator         │
//! │  graph.rs    - Org/team/repo graph types    │
//! │  builder.rs  - Randomized graph builder     │
//! │  derive.rs   - Tuple and probe derivation   │
//! │  model.rs    - TupleKey, Workload, stats    │
//! │  schema.rs   - Fixed authorization model    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use fgaload_graph::{GraphSize, Workload};
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let workload = Workload::generate(GraphSize::new(10, 20, 2), &mut rng);
//! assert!(!workload.tuples().is_empty());
//! ```

pub mod builder;
pub mod derive;
pub mod graph;
pub mod ids;
pub mod model;
pub mod schema;

#[cfg(test)]
mod graph_proptest;

// Re-export commonly used types at the crate root
pub use builder::GraphBuilder;
pub use derive::derive;
pub use graph::{AuthzGraph, Organization, PrivateRepo, PublicRepo, Team};
pub use ids::{GraphSize, IdentifierSet};
pub use model::{TupleKey, Workload, WorkloadStats};

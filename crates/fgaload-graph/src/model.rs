//! Tuple keys and the frozen workload handed to the network layer.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::builder::GraphBuilder;
use crate::derive::derive;
use crate::ids::GraphSize;

/// Relation names used by the generated tuples and probes.
pub mod relation {
    pub const OWNER: &str = "owner";
    pub const ADMIN: &str = "admin";
    pub const WRITER: &str = "writer";
    pub const READER: &str = "reader";
    pub const MEMBER: &str = "member";
    pub const REPO_ADMIN: &str = "repo_admin";
}

/// A relationship `(user, relation, object)`.
///
/// Used both for tuples written to the store and for check probes. Serializes
/// to the OpenFGA `tuple_key` shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TupleKey {
    /// The subject (e.g., "user:1" or "team:0/security#member").
    pub user: String,
    /// The relation (e.g., "reader").
    pub relation: String,
    /// The object (e.g., "repo:3").
    pub object: String,
}

impl TupleKey {
    /// Creates a new tuple key.
    pub fn new(
        user: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// Returns the type portion of the object (`repo` for `repo:0/1`).
    pub fn object_type(&self) -> Option<&str> {
        self.object.split_once(':').map(|(object_type, _)| object_type)
    }

    /// Checks that every field is populated and both user and object are
    /// `type:id` references.
    pub fn is_well_formed(&self) -> bool {
        fn is_reference(value: &str) -> bool {
            matches!(value.split_once(':'), Some((t, id)) if !t.is_empty() && !id.is_empty())
        }

        !self.relation.is_empty() && is_reference(&self.user) && is_reference(&self.object)
    }
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.object, self.relation, self.user)
    }
}

/// Tuples to write and checks to issue for one run.
///
/// Immutable once derived. Both lists are deduplicated and sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    tuples: Vec<TupleKey>,
    probes: Vec<TupleKey>,
    stats: WorkloadStats,
}

impl Workload {
    pub(crate) fn new(tuples: Vec<TupleKey>, probes: Vec<TupleKey>, stats: WorkloadStats) -> Self {
        Self {
            tuples,
            probes,
            stats,
        }
    }

    /// Builds a graph of the given size and derives its workload.
    pub fn generate<R: Rng + ?Sized>(size: GraphSize, rng: &mut R) -> Self {
        let graph = GraphBuilder::new(size).build(rng);
        derive(&graph)
    }

    /// Tuples to persist before probing.
    pub fn tuples(&self) -> &[TupleKey] {
        &self.tuples
    }

    /// Checks expected to be allowed once the tuples are written.
    pub fn probes(&self) -> &[TupleKey] {
        &self.probes
    }

    /// Summary counts.
    pub fn stats(&self) -> &WorkloadStats {
        &self.stats
    }

    /// Picks a probe uniformly at random. `None` when there are no probes.
    pub fn sample_probe<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&TupleKey> {
        if self.probes.is_empty() {
            return None;
        }
        self.probes.get(rng.gen_range(0..self.probes.len()))
    }
}

/// Summary of a generated workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadStats {
    pub users: usize,
    pub public_repos: usize,
    pub private_repos: usize,
    pub group_repos: usize,
    pub assigned_group_repos: usize,
    pub orgs: usize,
    pub teams: usize,
    pub total_tuples: usize,
    pub total_probes: usize,
    /// Tuple count per relation.
    pub tuples_by_relation: BTreeMap<String, usize>,
    /// Probe count per relation.
    pub probes_by_relation: BTreeMap<String, usize>,
}

pub(crate) fn count_by_relation(keys: &[TupleKey]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.relation.clone()).or_insert(0) += 1;
    }
    counts
}

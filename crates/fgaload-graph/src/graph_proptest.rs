//! Property-based tests for graph generation.

use std::collections::HashSet;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::builder::GraphBuilder;
use crate::derive::derive;
use crate::ids::GraphSize;

/// Strategy for graph sizes small enough to build quickly.
fn graph_size_strategy() -> impl Strategy<Value = GraphSize> {
    (1u32..60, 0u32..200, 0u32..12).prop_map(|(users, repos, orgs)| GraphSize::new(users, repos, orgs))
}

fn has_duplicates<T: Eq + std::hash::Hash>(items: &[T]) -> bool {
    let mut seen = HashSet::new();
    !items.iter().all(|item| seen.insert(item))
}

proptest! {
    #[test]
    fn test_repo_partition_covers_total(size in graph_size_strategy()) {
        let total = size.public_repos() + size.private_repos() + size.group_repos();
        // Each class rounds up, so at most two extra repos.
        prop_assert!(total >= size.total_repos);
        prop_assert!(total <= size.total_repos + 2);
    }

    #[test]
    fn test_memberships_are_deduplicated(size in graph_size_strategy(), seed in any::<u64>()) {
        let graph = GraphBuilder::new(size).build(&mut StdRng::seed_from_u64(seed));
        for org in &graph.orgs {
            prop_assert!(!has_duplicates(&org.members));
            prop_assert!(!has_duplicates(&org.repos));
            for team in &org.teams {
                prop_assert!(!has_duplicates(&team.members));
            }
        }
    }

    #[test]
    fn test_every_org_has_populated_security_team(size in graph_size_strategy(), seed in any::<u64>()) {
        let graph = GraphBuilder::new(size).build(&mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(graph.orgs.len(), size.total_orgs as usize);
        for org in &graph.orgs {
            let security = org.security_team();
            prop_assert!(security.is_some());
            prop_assert!(!security.unwrap().members.is_empty());
        }
    }

    #[test]
    fn test_org_repo_draws_bounded(size in graph_size_strategy(), seed in any::<u64>()) {
        let graph = GraphBuilder::new(size).build(&mut StdRng::seed_from_u64(seed));
        let fair_share = graph.group_repos.len() / graph.orgs.len().max(1);
        for org in &graph.orgs {
            prop_assert!(org.repos.len() <= fair_share);
            if fair_share > 0 {
                prop_assert!(!org.repos.is_empty());
            }
        }
    }

    #[test]
    fn test_derived_keys_are_well_formed_and_unique(size in graph_size_strategy(), seed in any::<u64>()) {
        let graph = GraphBuilder::new(size).build(&mut StdRng::seed_from_u64(seed));
        let workload = derive(&graph);
        for key in workload.tuples().iter().chain(workload.probes()) {
            prop_assert!(key.is_well_formed(), "malformed key: {}", key);
        }
        prop_assert!(!has_duplicates(workload.tuples()));
        prop_assert!(!has_duplicates(workload.probes()));
        prop_assert_eq!(workload.stats().total_tuples, workload.tuples().len());
    }

    #[test]
    fn test_derivation_is_repeatable(size in graph_size_strategy(), seed in any::<u64>()) {
        let graph = GraphBuilder::new(size).build(&mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(derive(&graph), derive(&graph));
    }

    #[test]
    fn test_exactly_one_repo_admin_tuple_per_org(size in graph_size_strategy(), seed in any::<u64>()) {
        let graph = GraphBuilder::new(size).build(&mut StdRng::seed_from_u64(seed));
        let workload = derive(&graph);
        let repo_admins = workload
            .tuples()
            .iter()
            .filter(|t| t.relation == "repo_admin")
            .count();
        prop_assert_eq!(repo_admins, graph.orgs.len());
    }
}

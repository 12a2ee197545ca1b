//! Randomized graph construction.
//!
//! The builder takes any [`rand::Rng`] so runs can be reproduced with a seeded
//! generator. All ranges are inclusive on both ends.

use std::collections::HashSet;
use std::hash::Hash;

use rand::Rng;
use tracing::debug;

use crate::graph::{AuthzGraph, Organization, PrivateRepo, PublicRepo, Team};
use crate::ids::{GraphSize, IdentifierSet, SECURITY_TEAM};

/// Teams per organization, not counting the security team.
pub const TEAMS_PER_ORG: (u32, u32) = (1, 7);

/// Members per team.
pub const MEMBERS_PER_TEAM: (u32, u32) = (1, 8);

/// Read probes sampled for every public repository.
pub const PUBLIC_REPO_PROBES: usize = 5;

/// Draws a uniform integer from `[lo, hi]`.
///
/// A degenerate range (`lo > hi`) yields `hi`.
pub fn draw<R: Rng + ?Sized>(rng: &mut R, lo: u32, hi: u32) -> u32 {
    if lo >= hi {
        return hi;
    }
    rng.gen_range(lo..=hi)
}

/// Builds [`AuthzGraph`]s from a fixed identifier set.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    size: GraphSize,
    ids: IdentifierSet,
}

impl GraphBuilder {
    /// Creates a builder for the given size.
    pub fn new(size: GraphSize) -> Self {
        Self {
            size,
            ids: IdentifierSet::generate(size),
        }
    }

    /// Returns the identifiers the builder draws from.
    pub fn ids(&self) -> &IdentifierSet {
        &self.ids
    }

    /// Builds a graph, drawing every random choice from `rng`.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> AuthzGraph {
        let public_repos = self
            .ids
            .public_repos
            .iter()
            .map(|&id| PublicRepo {
                id,
                sampled_readers: (0..PUBLIC_REPO_PROBES)
                    .filter_map(|_| self.random_user(rng))
                    .collect(),
            })
            .collect();

        let private_repos = self
            .ids
            .private_repos
            .iter()
            .map(|&id| PrivateRepo {
                id,
                writer: self.random_user(rng),
            })
            .collect();

        let orgs: Vec<Organization> = self
            .ids
            .orgs
            .iter()
            .map(|&id| self.build_org(id, rng))
            .collect();

        let graph = AuthzGraph {
            size: self.size,
            public_repos,
            private_repos,
            group_repos: self.ids.group_repos.clone(),
            orgs,
        };

        debug!(
            orgs = graph.orgs.len(),
            teams = graph.team_count(),
            assigned_group_repos = graph.assigned_group_repo_count(),
            "built authorization graph"
        );

        graph
    }

    fn build_org<R: Rng + ?Sized>(&self, id: u32, rng: &mut R) -> Organization {
        let team_count = draw(rng, TEAMS_PER_ORG.0, TEAMS_PER_ORG.1);

        let mut org_members = Vec::new();
        let mut teams = Vec::with_capacity(team_count as usize + 1);

        for index in 0..team_count {
            let members = self.random_members(rng);
            org_members.extend(members.iter().cloned());
            teams.push(Team {
                name: index.to_string(),
                members: dedup_in_order(members),
                admin_repos: 0,
            });
        }

        let security_members = self.random_members(rng);
        teams.push(Team {
            name: SECURITY_TEAM.to_string(),
            members: dedup_in_order(security_members),
            admin_repos: 0,
        });

        let repos = dedup_in_order(self.random_group_repos(rng));

        // Each team administers a prefix of the deduplicated repo list.
        let repo_count = u32::try_from(repos.len()).unwrap_or(u32::MAX);
        for team in teams.iter_mut().filter(|team| !team.is_security()) {
            team.admin_repos = draw(rng, 0, repo_count) as usize;
        }

        Organization {
            id,
            members: dedup_in_order(org_members),
            teams,
            repos,
        }
    }

    fn random_members<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<String> {
        let count = draw(rng, MEMBERS_PER_TEAM.0, MEMBERS_PER_TEAM.1);
        (0..count).filter_map(|_| self.random_user(rng)).collect()
    }

    fn random_group_repos<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<u32> {
        let pool = &self.ids.group_repos;
        if pool.is_empty() {
            return Vec::new();
        }

        let per_org = pool.len() / self.ids.orgs.len().max(1);
        let per_org = u32::try_from(per_org).unwrap_or(u32::MAX);
        let count = draw(rng, 1, per_org);

        (0..count)
            .map(|_| pool[draw(rng, 0, last_index(pool.len())) as usize])
            .collect()
    }

    fn random_user<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        if self.ids.users.is_empty() {
            return None;
        }
        let index = draw(rng, 0, last_index(self.ids.users.len()));
        Some(self.ids.users[index as usize].clone())
    }
}

fn last_index(len: usize) -> u32 {
    u32::try_from(len.saturating_sub(1)).unwrap_or(u32::MAX)
}

/// Removes repeats, keeping the first occurrence of each item.
fn dedup_in_order<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

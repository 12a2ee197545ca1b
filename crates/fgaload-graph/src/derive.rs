//! Tuple and probe derivation.
//!
//! Walks a built [`AuthzGraph`] and produces the tuples to write plus the
//! checks expected to be allowed once they are written. Probes on group repos
//! encode what the model derives (`repo_admin` on the owning org implies
//! `admin`, `admin` implies `writer`); they are never written themselves.

use std::collections::BTreeSet;

use crate::graph::{AuthzGraph, Organization};
use crate::ids::{self, USER_WILDCARD};
use crate::model::{count_by_relation, relation, TupleKey, Workload, WorkloadStats};

/// Derives the workload for a graph.
pub fn derive(graph: &AuthzGraph) -> Workload {
    let mut deriver = Deriver::default();

    for repo in &graph.public_repos {
        let object = ids::repo(repo.id);
        deriver.tuple(USER_WILDCARD, relation::READER, &object);
        for reader in &repo.sampled_readers {
            deriver.probe(reader, relation::READER, &object);
        }
    }

    for repo in &graph.private_repos {
        if let Some(writer) = &repo.writer {
            let object = ids::repo(repo.id);
            deriver.tuple(writer, relation::WRITER, &object);
            deriver.probe(writer, relation::READER, &object);
        }
    }

    for org in &graph.orgs {
        deriver.org(org);
    }

    let tuples: Vec<TupleKey> = deriver.tuples.into_iter().collect();
    let probes: Vec<TupleKey> = deriver.probes.into_iter().collect();

    let stats = WorkloadStats {
        users: graph.size.total_users as usize,
        public_repos: graph.public_repos.len(),
        private_repos: graph.private_repos.len(),
        group_repos: graph.group_repos.len(),
        assigned_group_repos: graph.assigned_group_repo_count(),
        orgs: graph.orgs.len(),
        teams: graph.team_count(),
        total_tuples: tuples.len(),
        total_probes: probes.len(),
        tuples_by_relation: count_by_relation(&tuples),
        probes_by_relation: count_by_relation(&probes),
    };

    Workload::new(tuples, probes, stats)
}

#[derive(Default)]
struct Deriver {
    tuples: BTreeSet<TupleKey>,
    probes: BTreeSet<TupleKey>,
}

impl Deriver {
    fn tuple(&mut self, user: &str, relation: &str, object: &str) {
        self.tuples.insert(TupleKey::new(user, relation, object));
    }

    fn probe(&mut self, user: &str, relation: &str, object: &str) {
        self.probes.insert(TupleKey::new(user, relation, object));
    }

    fn org(&mut self, org: &Organization) {
        let org_object = ids::org(org.id);
        let repos: Vec<String> = org
            .repos
            .iter()
            .map(|&repo| ids::group_repo(org.id, repo))
            .collect();

        for repo in &repos {
            self.tuple(&org_object, relation::OWNER, repo);
        }

        self.tuple(
            &ids::team_members(org.id, ids::SECURITY_TEAM),
            relation::REPO_ADMIN,
            &org_object,
        );

        for team in &org.teams {
            let team_object = ids::team(org.id, &team.name);
            for member in &team.members {
                self.tuple(member, relation::MEMBER, &team_object);
            }

            if team.is_security() {
                for member in &team.members {
                    for repo in &repos {
                        self.probe(member, relation::ADMIN, repo);
                    }
                }
                continue;
            }

            let administered = &repos[..team.admin_repos.min(repos.len())];
            let team_members = ids::team_members(org.id, &team.name);
            for repo in administered {
                self.tuple(&team_members, relation::ADMIN, repo);
            }
            for member in &team.members {
                for repo in administered {
                    self.probe(member, relation::WRITER, repo);
                }
            }
        }
    }
}

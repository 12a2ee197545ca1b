//! Graph types produced by the builder.
//!
//! Everything random about a run lives here. Derivation only reads the graph,
//! so deriving twice from the same graph gives the same tuples and probes.

use serde::Serialize;

use crate::ids::{GraphSize, SECURITY_TEAM};

/// The built authorization graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthzGraph {
    /// Size the graph was built for.
    pub size: GraphSize,
    /// Publicly readable repositories.
    pub public_repos: Vec<PublicRepo>,
    /// Repositories written by a single user.
    pub private_repos: Vec<PrivateRepo>,
    /// The pool of group repository ids orgs draw from.
    pub group_repos: Vec<u32>,
    /// Organizations with their teams and assigned repositories.
    pub orgs: Vec<Organization>,
}

impl AuthzGraph {
    /// Total number of teams across all organizations, security teams included.
    pub fn team_count(&self) -> usize {
        self.orgs.iter().map(|org| org.teams.len()).sum()
    }

    /// Number of distinct group repositories assigned to some organization.
    pub fn assigned_group_repo_count(&self) -> usize {
        self.orgs.iter().map(|org| org.repos.len()).sum()
    }
}

/// A public repository and the users sampled to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicRepo {
    pub id: u32,
    /// Users whose read access gets probed. May contain repeats.
    pub sampled_readers: Vec<String>,
}

/// A private repository with its single writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivateRepo {
    pub id: u32,
    /// `None` only when the graph has no users.
    pub writer: Option<String>,
}

/// An organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organization {
    pub id: u32,
    /// Members of the non-security teams, deduplicated.
    pub members: Vec<String>,
    /// Teams, the security team last.
    pub teams: Vec<Team>,
    /// Assigned group repository ids, deduplicated in draw order.
    pub repos: Vec<u32>,
}

impl Organization {
    /// Returns the organization's security team.
    pub fn security_team(&self) -> Option<&Team> {
        self.teams.iter().find(|team| team.is_security())
    }
}

/// A team inside an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Team {
    pub name: String,
    /// Deduplicated members.
    pub members: Vec<String>,
    /// Length of the prefix of the org's repos this team administers.
    ///
    /// Always 0 for the security team, which reaches every org repo through
    /// `repo_admin` instead.
    pub admin_repos: usize,
}

impl Team {
    /// Whether this is the organization's security team.
    pub fn is_security(&self) -> bool {
        self.name == SECURITY_TEAM
    }
}

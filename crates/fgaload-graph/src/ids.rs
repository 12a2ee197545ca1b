//! Identifier generation.
//!
//! Repository ids are numbered per visibility class, so `repo:3` (private) and
//! `repo:0/3` (group repo 3 owned by org 0) are different objects even though
//! they share the numeric id.

use serde::{Deserialize, Serialize};

/// The wildcard user, matching every user where the model allows it.
pub const USER_WILDCARD: &str = "user:*";

/// Name of the privileged team every organization has.
pub const SECURITY_TEAM: &str = "security";

/// Share of repositories that are public, in percent.
pub const PUBLIC_REPO_PERCENT: u32 = 20;

/// Share of repositories that are private, in percent.
pub const PRIVATE_REPO_PERCENT: u32 = 40;

/// Share of repositories that are owned by organizations, in percent.
pub const GROUP_REPO_PERCENT: u32 = 40;

/// Requested size of the generated graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSize {
    /// Number of users.
    pub total_users: u32,
    /// Number of repositories across all visibility classes.
    pub total_repos: u32,
    /// Number of organizations.
    pub total_orgs: u32,
}

impl GraphSize {
    /// Creates a new graph size.
    pub fn new(total_users: u32, total_repos: u32, total_orgs: u32) -> Self {
        Self {
            total_users,
            total_repos,
            total_orgs,
        }
    }

    /// Number of public repositories.
    pub fn public_repos(&self) -> u32 {
        share(self.total_repos, PUBLIC_REPO_PERCENT)
    }

    /// Number of private repositories.
    pub fn private_repos(&self) -> u32 {
        share(self.total_repos, PRIVATE_REPO_PERCENT)
    }

    /// Number of group (organization-owned) repositories.
    pub fn group_repos(&self) -> u32 {
        share(self.total_repos, GROUP_REPO_PERCENT)
    }
}

impl Default for GraphSize {
    fn default() -> Self {
        Self::new(250, 1000, 35)
    }
}

/// Percentage of `total`, rounded up.
fn share(total: u32, percent: u32) -> u32 {
    let scaled = u64::from(total) * u64::from(percent);
    // Bounded by `total` since percent <= 100.
    scaled.div_ceil(100) as u32
}

/// Identifier sets for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSet {
    /// Formatted user identifiers, `user:0` onwards.
    pub users: Vec<String>,
    /// Public repository ids.
    pub public_repos: Vec<u32>,
    /// Private repository ids.
    pub private_repos: Vec<u32>,
    /// Group repository ids, assigned to orgs by the builder.
    pub group_repos: Vec<u32>,
    /// Organization ids.
    pub orgs: Vec<u32>,
}

impl IdentifierSet {
    /// Generates identifiers for the given size.
    pub fn generate(size: GraphSize) -> Self {
        Self {
            users: (0..size.total_users).map(user).collect(),
            public_repos: (0..size.public_repos()).collect(),
            private_repos: (0..size.private_repos()).collect(),
            group_repos: (0..size.group_repos()).collect(),
            orgs: (0..size.total_orgs).collect(),
        }
    }

    /// Total repositories across the three classes.
    pub fn total_repos(&self) -> usize {
        self.public_repos.len() + self.private_repos.len() + self.group_repos.len()
    }
}

/// `user:<n>`
pub fn user(n: u32) -> String {
    format!("user:{n}")
}

/// `repo:<n>` for public and private repositories.
pub fn repo(n: u32) -> String {
    format!("repo:{n}")
}

/// `repo:<org>/<n>` for group repositories.
pub fn group_repo(org: u32, n: u32) -> String {
    format!("repo:{org}/{n}")
}

/// `org:<n>`
pub fn org(n: u32) -> String {
    format!("org:{n}")
}

/// `team:<org>/<name>`
pub fn team(org: u32, name: &str) -> String {
    format!("team:{org}/{name}")
}

/// `team:<org>/<name>#member`, the userset of a team's members.
pub fn team_members(org: u32, name: &str) -> String {
    format!("team:{org}/{name}#member")
}

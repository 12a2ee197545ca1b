//! Named run profiles.
//!
//! | name   | vus | duration | write mode |
//! |--------|-----|----------|------------|
//! | smoke  | 1   | 10s      | concurrent |
//! | load   | 10  | 60s      | sequential |
//! | stress | 50  | 300s     | sequential |
//! | soak   | 20  | 1800s    | sequential |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use fgaload_client::BatchMode;
use serde::{Deserialize, Serialize};

/// A named profile of VU count, duration and write mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Smoke,
    Load,
    Stress,
    Soak,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Smoke,
        Scenario::Load,
        Scenario::Stress,
        Scenario::Soak,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Smoke => "smoke",
            Scenario::Load => "load",
            Scenario::Stress => "stress",
            Scenario::Soak => "soak",
        }
    }

    /// The profile before configuration overrides.
    pub fn profile(self) -> Profile {
        let (vus, secs, write_mode) = match self {
            Scenario::Smoke => (1, 10, BatchMode::Concurrent),
            Scenario::Load => (10, 60, BatchMode::Sequential),
            Scenario::Stress => (50, 300, BatchMode::Sequential),
            Scenario::Soak => (20, 1800, BatchMode::Sequential),
        };
        Profile {
            scenario: self,
            vus,
            duration: Duration::from_secs(secs),
            write_mode,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a scenario name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scenario '{0}', expected one of: smoke, load, stress, soak")]
pub struct UnknownScenario(pub String);

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == lowered)
            .ok_or_else(|| UnknownScenario(s.to_string()))
    }
}

/// Resolved run shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub scenario: Scenario,
    pub vus: usize,
    pub duration: Duration,
    pub write_mode: BatchMode,
}

impl Profile {
    /// Applies configured overrides for VU count and duration.
    pub fn with_overrides(mut self, vus: Option<usize>, duration_secs: Option<u64>) -> Self {
        if let Some(vus) = vus {
            self.vus = vus;
        }
        if let Some(secs) = duration_secs {
            self.duration = Duration::from_secs(secs);
        }
        self
    }
}

//! Configuration management for fgaload.
//!
//! Sources, lowest precedence first:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables use the `FGALOAD_` prefix and `__` between nested
//! keys, e.g. `FGALOAD_API__STORE_ID` or `FGALOAD_WORKLOAD__TOTAL_REPOS`.
//!
//! # Example
//!
//! ```yaml
//! api:
//!   base_uri: http://localhost:8080
//!   store_id: 01HVMMBCMGZNT3SED4Z17ECXCA
//! workload:
//!   total_users: 250
//!   total_repos: 1000
//!   total_orgs: 35
//! run:
//!   scenario: load
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use fgaload_client::client::DEFAULT_RATE_LIMIT_HEADER;
use fgaload_client::ClientConfig;
use fgaload_graph::GraphSize;
use serde::{Deserialize, Serialize};

use crate::scenario::{Profile, Scenario};

const ENV_PREFIX: &str = "FGALOAD";

/// Load test configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct LoadTestConfig {
    /// Service under test
    #[serde(default)]
    pub api: ApiSettings,

    /// Graph size and batching
    #[serde(default)]
    pub workload: WorkloadSettings,

    /// Scenario and phase settings
    #[serde(default)]
    pub run: RunSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Metrics settings
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Connection settings for the service under test.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ApiSettings {
    #[serde(default = "default_base_uri")]
    pub base_uri: String,

    /// Store to run against. Required by `run`, ignored by `plan`.
    ///
    /// Environment variable: `FGALOAD_API__STORE_ID`
    #[serde(default)]
    pub store_id: Option<String>,

    /// Bearer token sent as `Authorization: Bearer <token>`.
    ///
    /// Environment variable: `FGALOAD_API__TOKEN`
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Response header whose value `0` means the quota is exhausted.
    #[serde(default = "default_rate_limit_header")]
    pub rate_limit_header: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_uri: default_base_uri(),
            store_id: None,
            token: None,
            request_timeout_secs: default_request_timeout(),
            rate_limit_header: default_rate_limit_header(),
        }
    }
}

fn default_base_uri() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_rate_limit_header() -> String {
    DEFAULT_RATE_LIMIT_HEADER.to_string()
}

/// Size of the generated graph.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WorkloadSettings {
    #[serde(default = "default_total_users")]
    pub total_users: u32,

    #[serde(default = "default_total_repos")]
    pub total_repos: u32,

    #[serde(default = "default_total_orgs")]
    pub total_orgs: u32,

    /// Tuples per write or delete request
    #[serde(default = "default_tuples_per_write")]
    pub tuples_per_write: usize,

    /// Seed for reproducible graphs. Random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            total_users: default_total_users(),
            total_repos: default_total_repos(),
            total_orgs: default_total_orgs(),
            tuples_per_write: default_tuples_per_write(),
            seed: None,
        }
    }
}

fn default_total_users() -> u32 {
    250
}

fn default_total_repos() -> u32 {
    1000
}

fn default_total_orgs() -> u32 {
    35
}

fn default_tuples_per_write() -> usize {
    fgaload_client::batch::DEFAULT_BATCH_SIZE
}

/// Scenario selection and phase timeouts.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RunSettings {
    /// One of `smoke`, `load`, `stress`, `soak`
    #[serde(default = "default_scenario")]
    pub scenario: String,

    /// Overrides the scenario's VU count
    #[serde(default)]
    pub vus: Option<usize>,

    /// Overrides the scenario's duration
    #[serde(default)]
    pub duration_secs: Option<u64>,

    #[serde(default = "default_phase_timeout")]
    pub setup_timeout_secs: u64,

    #[serde(default = "default_phase_timeout")]
    pub teardown_timeout_secs: u64,

    /// Delete the written tuples after the run
    #[serde(default = "default_true")]
    pub teardown: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            scenario: default_scenario(),
            vus: None,
            duration_secs: None,
            setup_timeout_secs: default_phase_timeout(),
            teardown_timeout_secs: default_phase_timeout(),
            teardown: true,
        }
    }
}

fn default_scenario() -> String {
    Scenario::Smoke.name().to_string()
}

fn default_phase_timeout() -> u64 {
    120
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MetricsSettings {
    /// Install the Prometheus recorder
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Serve `/metrics` on this address during the run
    #[serde(default)]
    pub listen_addr: Option<SocketAddr>,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigLoadError {
    fn invalid(message: impl Into<String>) -> Self {
        ConfigLoadError::Invalid {
            message: message.into(),
        }
    }
}

impl LoadTestConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&LoadTestConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let loaded: LoadTestConfig = config.try_deserialize()?;
        loaded.validate()?;

        Ok(loaded)
    }

    /// Load configuration from defaults and environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&LoadTestConfig::default())?)
            .add_source(env_source())
            .build()?;

        let loaded: LoadTestConfig = config.try_deserialize()?;
        loaded.validate()?;

        Ok(loaded)
    }

    /// Validate the configuration.
    ///
    /// A missing store id passes here; `run` rejects it through
    /// [`LoadTestConfig::store_id`].
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self
            .api
            .store_id
            .as_deref()
            .is_some_and(|id| id.trim().is_empty())
        {
            return Err(ConfigLoadError::invalid("api.store_id must not be empty"));
        }

        let base = self.api.base_uri.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigLoadError::invalid(format!(
                "api.base_uri must be an http(s) URI, got: {}",
                self.api.base_uri
            )));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(ConfigLoadError::invalid(
                "api.request_timeout_secs must be greater than 0",
            ));
        }

        if self.api.rate_limit_header.trim().is_empty() {
            return Err(ConfigLoadError::invalid(
                "api.rate_limit_header must not be empty",
            ));
        }

        if self.workload.tuples_per_write == 0 {
            return Err(ConfigLoadError::invalid(
                "workload.tuples_per_write must be greater than 0",
            ));
        }

        let workload = &self.workload;
        if workload.total_users == 0 && (workload.total_repos > 0 || workload.total_orgs > 0) {
            return Err(ConfigLoadError::invalid(
                "workload.total_users must be greater than 0 when repos or orgs are requested",
            ));
        }

        self.scenario()?;

        if self.run.vus == Some(0) {
            return Err(ConfigLoadError::invalid("run.vus must be greater than 0"));
        }
        if self.run.duration_secs == Some(0) {
            return Err(ConfigLoadError::invalid(
                "run.duration_secs must be greater than 0",
            ));
        }
        if self.run.setup_timeout_secs == 0 || self.run.teardown_timeout_secs == 0 {
            return Err(ConfigLoadError::invalid(
                "run.setup_timeout_secs and run.teardown_timeout_secs must be greater than 0",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::invalid(format!(
                "logging.level must be one of: {:?}, got: {}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }

    /// The configured store id, required for any traffic.
    pub fn store_id(&self) -> Result<&str, ConfigLoadError> {
        self.api
            .store_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ConfigLoadError::invalid(
                    "api.store_id is required (set FGALOAD_API__STORE_ID or api.store_id)",
                )
            })
    }

    pub fn scenario(&self) -> Result<Scenario, ConfigLoadError> {
        self.run
            .scenario
            .parse()
            .map_err(|err: crate::scenario::UnknownScenario| {
                ConfigLoadError::invalid(format!("run.scenario: {err}"))
            })
    }

    /// The scenario profile with VU and duration overrides applied.
    pub fn profile(&self) -> Result<Profile, ConfigLoadError> {
        Ok(self
            .scenario()?
            .profile()
            .with_overrides(self.run.vus, self.run.duration_secs))
    }

    pub fn graph_size(&self) -> GraphSize {
        GraphSize::new(
            self.workload.total_users,
            self.workload.total_repos,
            self.workload.total_orgs,
        )
    }

    /// Client settings for the configured store.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigLoadError> {
        let mut client = ClientConfig::new(self.api.base_uri.trim(), self.store_id()?)
            .with_timeout(Duration::from_secs(self.api.request_timeout_secs));
        client.rate_limit_header = self.api.rate_limit_header.trim().to_ascii_lowercase();
        if let Some(token) = self.api.token.as_deref().filter(|t| !t.is_empty()) {
            client = client.with_token(token);
        }
        Ok(client)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.run.setup_timeout_secs)
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_secs(self.run.teardown_timeout_secs)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

//! Runner configuration
//!
//! Everything the orchestrator needs from the process environment is read
//! once into an immutable [`RunnerConfig`] and passed around explicitly.

pub mod environment;

pub use environment::{EnvironmentConfig, EnvironmentLoader};

use crate::error::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

pub const RUNNER_POD_NAME_VAR: &str = "ACTIONS_RUNNER_POD_NAME";
pub const RUNNER_CLAIM_NAME_VAR: &str = "ACTIONS_RUNNER_CLAIM_NAME";
pub const NAMESPACE_VAR: &str = "ACTIONS_RUNNER_KUBERNETES_NAMESPACE";
pub const RUNNER_TEMP_VAR: &str = "RUNNER_TEMP";
pub const GITHUB_WORKSPACE_VAR: &str = "GITHUB_WORKSPACE";
pub const KUBECTL_PATH_VAR: &str = "KUBECTL_PATH";
pub const POLL_INTERVAL_VAR: &str = "ACTIONS_RUNNER_POLL_INTERVAL_SECONDS";
pub const POD_DISCOVERY_TIMEOUT_VAR: &str = "ACTIONS_RUNNER_POD_DISCOVERY_TIMEOUT_SECONDS";
pub const POD_WAIT_TIMEOUT_VAR: &str = "ACTIONS_RUNNER_POD_WAIT_TIMEOUT_SECONDS";
pub const JOB_WAIT_TIMEOUT_VAR: &str = "ACTIONS_RUNNER_JOB_WAIT_TIMEOUT_SECONDS";

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_RUNNER_TEMP: &str = "/home/runner/_work/_temp";
const DEFAULT_KUBECTL_PATH: &str = "kubectl";
const DEFAULT_POLL_INTERVAL_SECONDS: &str = "1";
const DEFAULT_POD_DISCOVERY_TIMEOUT_SECONDS: &str = "60";
const DEFAULT_POD_WAIT_TIMEOUT_SECONDS: &str = "600";
const DEFAULT_JOB_WAIT_TIMEOUT_SECONDS: &str = "21600";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Runner identity; base for every generated resource name.
    pub runner_pod_name: String,
    /// Claim backing the shared `work` volume.
    pub volume_claim_name: String,
    pub namespace: String,
    /// Host-side directory shared with step containers as `/__w/_temp`.
    pub runner_temp: PathBuf,
    pub github_workspace: Option<String>,
    pub kubectl_path: String,
    pub poll_interval: Duration,
    pub pod_discovery_timeout: Duration,
    pub pod_phase_timeout: Duration,
    pub job_completion_timeout: Duration,
}

impl RunnerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_loader(EnvironmentLoader::from_process())
    }

    /// Build the configuration from an explicit variable map.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_loader(EnvironmentLoader::from_vars(vars))
    }

    fn from_loader(loader: EnvironmentLoader) -> Result<Self> {
        let env = loader
            .require_var(RUNNER_POD_NAME_VAR)
            .require_var(RUNNER_CLAIM_NAME_VAR)
            .optional_var(NAMESPACE_VAR, DEFAULT_NAMESPACE)
            .optional_var(RUNNER_TEMP_VAR, DEFAULT_RUNNER_TEMP)
            .optional_var(GITHUB_WORKSPACE_VAR, "")
            .optional_var(KUBECTL_PATH_VAR, DEFAULT_KUBECTL_PATH)
            .optional_var(POLL_INTERVAL_VAR, DEFAULT_POLL_INTERVAL_SECONDS)
            .optional_var(POD_DISCOVERY_TIMEOUT_VAR, DEFAULT_POD_DISCOVERY_TIMEOUT_SECONDS)
            .optional_var(POD_WAIT_TIMEOUT_VAR, DEFAULT_POD_WAIT_TIMEOUT_SECONDS)
            .optional_var(JOB_WAIT_TIMEOUT_VAR, DEFAULT_JOB_WAIT_TIMEOUT_SECONDS)
            .load()?;

        let config = Self {
            runner_pod_name: env.get_or_default(RUNNER_POD_NAME_VAR, ""),
            volume_claim_name: env.get_or_default(RUNNER_CLAIM_NAME_VAR, ""),
            namespace: env.get_or_default(NAMESPACE_VAR, DEFAULT_NAMESPACE),
            runner_temp: PathBuf::from(env.get_or_default(RUNNER_TEMP_VAR, DEFAULT_RUNNER_TEMP)),
            github_workspace: env.get_non_empty(GITHUB_WORKSPACE_VAR),
            kubectl_path: env.get_or_default(KUBECTL_PATH_VAR, DEFAULT_KUBECTL_PATH),
            poll_interval: Duration::from_secs(env.get_int(POLL_INTERVAL_VAR)?),
            pod_discovery_timeout: Duration::from_secs(env.get_int(POD_DISCOVERY_TIMEOUT_VAR)?),
            pod_phase_timeout: Duration::from_secs(env.get_int(POD_WAIT_TIMEOUT_VAR)?),
            job_completion_timeout: Duration::from_secs(env.get_int(JOB_WAIT_TIMEOUT_VAR)?),
        };

        info!("📋 Runner configuration loaded:");
        info!("  - Runner pod: {}", config.runner_pod_name);
        info!("  - Volume claim: {}", config.volume_claim_name);
        info!("  - Namespace: {}", config.namespace);
        debug!("  - Runner temp: {}", config.runner_temp.display());
        debug!(
            "  - Poll interval: {:?}, pod wait: {:?}, job wait: {:?}",
            config.poll_interval, config.pod_phase_timeout, config.job_completion_timeout
        );

        Ok(config)
    }
}

//! Kubernetes connector implementation
//!
//! Runs one container step as a Kubernetes Job:
//! - Resource naming and entry-point script materialization
//! - Job manifest generation and submission
//! - Pod phase waiting, log forwarding and completion waiting
//! - Exit code extraction from the pod's container statuses

use super::entrypoint::{EntryPointWriter, ResolvedEntryPoint};
use super::job_manager::KubernetesJobManager;
use super::naming::NameGenerator;
use super::yaml_generator::{JobManifest, KubernetesYamlGenerator, JOB_CONTAINER_NAME};
use crate::ci::config::StepDescriptor;
use crate::ci::connectors::traits::{KubernetesApi, PodPhase, PodStatus};
use crate::config::RunnerConfig;
use crate::error::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Kubernetes connector for executing container steps as Jobs
pub struct KubernetesConnector {
    config: Arc<RunnerConfig>,
    names: NameGenerator,
    entry_points: EntryPointWriter,
    job_manager: KubernetesJobManager,
}

impl KubernetesConnector {
    pub fn new(config: Arc<RunnerConfig>, api: Arc<dyn KubernetesApi>) -> Self {
        let job_manager = KubernetesJobManager::new(api, &config);
        Self::with_job_manager(config, job_manager)
    }

    pub fn with_job_manager(config: Arc<RunnerConfig>, job_manager: KubernetesJobManager) -> Self {
        Self {
            names: NameGenerator::new(&config),
            entry_points: EntryPointWriter::new(&config.runner_temp),
            job_manager,
            config,
        }
    }

    /// Materialize the entry-point script and build the Job for `step`.
    pub async fn build_job_manifest(&self, step: &StepDescriptor) -> Result<JobManifest> {
        step.validate()?;

        let resolved = ResolvedEntryPoint::resolve(
            step.entry_point.as_deref(),
            step.entry_point_args.as_deref(),
        );
        let script = self
            .entry_points
            .write(&step.working_directory, &resolved, &step.prepend_path)
            .await?;

        let container = KubernetesYamlGenerator::build_container_spec(
            step,
            &script,
            KubernetesYamlGenerator::container_volumes(self.config.github_workspace.as_deref()),
        )?;

        Ok(KubernetesYamlGenerator::generate_job_manifest(
            &self.names.step_pod_name(),
            container,
            &self.names.runner_label(),
            self.names.volume_claim_name(),
        ))
    }

    /// Drive `step` to completion and return its process exit code
    pub async fn run_container_step(&self, step: &StepDescriptor) -> Result<i32> {
        info!("☸️ Running container step with image: {}", step.image);

        let manifest = self.build_job_manifest(step).await?;
        let job_name = self.job_manager.submit_job(&manifest).await?;

        let pod_name = self.job_manager.get_container_job_pod_name(&job_name).await?;
        self.job_manager
            .wait_for_pod_phases(
                &pod_name,
                &HashSet::from([PodPhase::Completed, PodPhase::Running]),
                &HashSet::from([PodPhase::Pending]),
            )
            .await?;

        self.job_manager
            .get_pod_logs(&pod_name, JOB_CONTAINER_NAME)
            .await?;
        self.job_manager.wait_for_job_to_complete(&job_name).await?;

        let status = self.job_manager.get_pod_status(&pod_name).await?;
        let exit_code = exit_code_from_status(&status);

        info!(
            "🏁 Container step finished: job={}, pod={}, exit_code={}",
            job_name, pod_name, exit_code
        );
        Ok(exit_code)
    }
}

/// Exit code of the last reported container; 0 when it cannot be determined.
pub fn exit_code_from_status(status: &PodStatus) -> i32 {
    // Positional: relies on the platform's container status ordering.
    let Some(last) = status.container_statuses.last() else {
        warn!("⚠️ Can't determine container status");
        return 0;
    };

    let exit_code = last
        .terminated
        .as_ref()
        .and_then(|terminated| terminated.exit_code)
        .unwrap_or(0);

    debug!(
        "📊 Container {} exit code: {} ({} status(es) reported)",
        last.name,
        exit_code,
        status.container_statuses.len()
    );
    exit_code
}

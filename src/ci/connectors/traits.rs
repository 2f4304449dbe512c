use super::kubernetes::yaml_generator::JobManifest;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Coarse pod lifecycle state reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Completed,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Map a platform phase string; unrecognised values are `Unknown`.
    pub fn from_platform(phase: &str) -> Self {
        match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" | "Completed" => PodPhase::Completed,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

impl std::fmt::Display for PodPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PodPhase::Pending => write!(f, "Pending"),
            PodPhase::Running => write!(f, "Running"),
            PodPhase::Completed => write!(f, "Completed"),
            PodPhase::Failed => write!(f, "Failed"),
            PodPhase::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Terminated state of a container
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TerminatedState {
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    pub name: String,
    /// `None` while the container is waiting or running.
    pub terminated: Option<TerminatedState>,
}

impl ContainerStatus {
    pub fn running(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            terminated: None,
        }
    }

    pub fn terminated(name: impl Into<String>, exit_code: i32) -> Self {
        Self {
            name: name.into(),
            terminated: Some(TerminatedState {
                exit_code: Some(exit_code),
            }),
        }
    }
}

/// Pod status information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodStatus {
    pub phase: PodPhase,
    /// Kept in the order the platform reported them.
    pub container_statuses: Vec<ContainerStatus>,
}

impl PodStatus {
    pub fn new(phase: PodPhase) -> Self {
        Self {
            phase,
            container_statuses: Vec::new(),
        }
    }

    pub fn with_container(mut self, status: ContainerStatus) -> Self {
        self.container_statuses.push(status);
        self
    }
}

/// Job completion counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobStatus {
    pub active: i32,
    pub succeeded: i32,
    pub failed: i32,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        self.succeeded > 0 || self.failed > 0
    }
}

/// What the platform echoed back after accepting a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedWorkload {
    /// Platform-assigned name; absence is a contract violation.
    pub name: Option<String>,
}

/// Orchestration-platform API used by the step orchestrator
///
/// Every call may suspend. Implementations report "not there yet" as
/// `Ok(None)` rather than an error so callers can retry within their poll
/// budget.
#[async_trait]
pub trait KubernetesApi: Send + Sync {
    /// Create the job described by `manifest`.
    async fn submit_workload(&self, manifest: &JobManifest) -> Result<SubmittedWorkload>;

    /// Name of the pod owned by `job_name`, if one has been scheduled.
    async fn get_pod_name_for_workload(&self, job_name: &str) -> Result<Option<String>>;

    async fn get_pod_status(&self, pod_name: &str) -> Result<PodStatus>;

    /// Forward the container's logs to the caller's output channel.
    async fn stream_logs(&self, pod_name: &str, container_name: &str) -> Result<()>;

    async fn get_workload_status(&self, job_name: &str) -> Result<JobStatus>;
}

//! Platform connectors for container steps
//!
//! `traits` describes the orchestration-platform API the step orchestrator
//! drives; `kubernetes` holds the orchestrator itself and the kubectl-backed
//! client.

pub mod kubernetes;
pub mod traits;

pub use kubernetes::KubernetesConnector;
pub use traits::{ContainerStatus, JobStatus, KubernetesApi, PodPhase, PodStatus};

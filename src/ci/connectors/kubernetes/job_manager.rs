//! Kubernetes job lifecycle management
//!
//! This module drives a submitted step job:
//! - Job submission and name verification
//! - Pod discovery for the job
//! - Pod phase waiting with acceptance / pass-through sets
//! - Log forwarding and job completion waiting

use super::polling::{Poller, Probe};
use super::yaml_generator::JobManifest;
use crate::ci::connectors::traits::{JobStatus, KubernetesApi, PodPhase, PodStatus};
use crate::config::RunnerConfig;
use crate::error::{AppError, Result};
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Kubernetes job manager for handling job lifecycle
pub struct KubernetesJobManager {
    api: Arc<dyn KubernetesApi>,
    discovery: Poller,
    pod_phase: Poller,
    completion: Poller,
}

impl KubernetesJobManager {
    pub fn new(api: Arc<dyn KubernetesApi>, config: &RunnerConfig) -> Self {
        Self {
            api,
            discovery: Poller::new(config.poll_interval, config.pod_discovery_timeout),
            pod_phase: Poller::new(config.poll_interval, config.pod_phase_timeout),
            completion: Poller::new(config.poll_interval, config.job_completion_timeout),
        }
    }

    /// Share one cancellation flag across all three waits.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.discovery = self.discovery.with_cancel_flag(flag.clone());
        self.pod_phase = self.pod_phase.with_cancel_flag(flag.clone());
        self.completion = self.completion.with_cancel_flag(flag);
        self
    }

    /// Submit a job and return the name the platform assigned to it
    pub async fn submit_job(&self, manifest: &JobManifest) -> Result<String> {
        info!(
            "🚀 Submitting Kubernetes job: {}",
            manifest.name().unwrap_or("<unnamed>")
        );

        let submitted = self.api.submit_workload(manifest).await?;

        match submitted.name.filter(|name| !name.is_empty()) {
            Some(name) => {
                info!("✅ Kubernetes job submitted: {}", name);
                Ok(name)
            }
            None => Err(AppError::IntegrityError(format!(
                "Expected job {} to have correctly set the metadata.name",
                manifest.name().unwrap_or("<unnamed>")
            ))),
        }
    }

    /// Find the pod backing `job_name`, retrying until it is scheduled
    pub async fn get_container_job_pod_name(&self, job_name: &str) -> Result<String> {
        debug!("🔍 Finding pod for job: {}", job_name);

        let api = &self.api;
        let pod_name = self
            .discovery
            .poll_until(&format!("pod of job {}", job_name), move || async move {
                Ok::<_, AppError>(match api.get_pod_name_for_workload(job_name).await? {
                    Some(pod_name) => Probe::Done(pod_name),
                    None => {
                        debug!("⏸️ No pod for job {} yet", job_name);
                        Probe::Continue
                    }
                })
            })
            .await?;

        info!("✅ Found pod {} for job {}", pod_name, job_name);
        Ok(pod_name)
    }

    /// Block until the pod reaches a phase in `awaiting`, tolerating phases
    /// in `back_off` along the way. Any other phase fails the wait.
    pub async fn wait_for_pod_phases(
        &self,
        pod_name: &str,
        awaiting: &HashSet<PodPhase>,
        back_off: &HashSet<PodPhase>,
    ) -> Result<PodPhase> {
        info!("⏳ Waiting for pod {} to become ready", pod_name);

        let api = &self.api;
        let phase = self
            .pod_phase
            .poll_until(&format!("pod {}", pod_name), move || async move {
                let phase = api.get_pod_status(pod_name).await?.phase;
                debug!("📊 Pod {} phase: {}", pod_name, phase);

                if awaiting.contains(&phase) {
                    Ok(Probe::Done(phase))
                } else if back_off.contains(&phase) {
                    Ok(Probe::Continue)
                } else {
                    Err(AppError::PodUnhealthy {
                        pod: pod_name.to_string(),
                        phase: phase.to_string(),
                    })
                }
            })
            .await?;

        info!("✅ Pod {} reached phase {}", pod_name, phase);
        Ok(phase)
    }

    /// Forward the container's logs to the output channel
    pub async fn get_pod_logs(&self, pod_name: &str, container_name: &str) -> Result<()> {
        debug!("📋 Streaming logs from {}/{}", pod_name, container_name);
        self.api.stream_logs(pod_name, container_name).await
    }

    /// Block until the job reports success or failure
    pub async fn wait_for_job_to_complete(&self, job_name: &str) -> Result<JobStatus> {
        info!("⏳ Waiting for job completion: {}", job_name);

        let api = &self.api;
        let status = self
            .completion
            .poll_until(&format!("job {}", job_name), move || async move {
                let status = api.get_workload_status(job_name).await?;
                Ok::<_, AppError>(if status.is_terminal() {
                    Probe::Done(status)
                } else {
                    debug!("🔄 Job {} still active ({} pod(s))", job_name, status.active);
                    Probe::Continue
                })
            })
            .await?;

        if status.failed > 0 {
            warn!("⚠️ Job {} has failed", job_name);
        } else {
            info!("✅ Job completed successfully: {}", job_name);
        }

        Ok(status)
    }

    pub async fn get_pod_status(&self, pod_name: &str) -> Result<PodStatus> {
        self.api.get_pod_status(pod_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::connectors::traits::SubmittedWorkload;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted answers; the last answer repeats once the script runs out.
    #[derive(Default)]
    struct ReplayApi {
        submitted_name: Option<String>,
        pod_names: Mutex<VecDeque<Option<String>>>,
        phases: Mutex<VecDeque<PodPhase>>,
        jobs: Mutex<VecDeque<JobStatus>>,
        phase_calls: Mutex<u32>,
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> T {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }

    #[async_trait]
    impl KubernetesApi for ReplayApi {
        async fn submit_workload(&self, _manifest: &JobManifest) -> Result<SubmittedWorkload> {
            Ok(SubmittedWorkload {
                name: self.submitted_name.clone(),
            })
        }

        async fn get_pod_name_for_workload(&self, _job_name: &str) -> Result<Option<String>> {
            Ok(next(&self.pod_names))
        }

        async fn get_pod_status(&self, _pod_name: &str) -> Result<PodStatus> {
            *self.phase_calls.lock().unwrap() += 1;
            Ok(PodStatus::new(next(&self.phases)))
        }

        async fn stream_logs(&self, _pod_name: &str, _container_name: &str) -> Result<()> {
            Ok(())
        }

        async fn get_workload_status(&self, _job_name: &str) -> Result<JobStatus> {
            Ok(next(&self.jobs))
        }
    }

    fn manager(api: Arc<ReplayApi>) -> KubernetesJobManager {
        let poller = Poller::new(Duration::from_millis(1), Duration::from_millis(500));
        KubernetesJobManager {
            api,
            discovery: poller.clone(),
            pod_phase: poller.clone(),
            completion: poller,
        }
    }

    fn manifest() -> JobManifest {
        serde_yaml::from_str(
            r#"
apiVersion: batch/v1
kind: Job
metadata:
  name: runner-step-0123abcd
spec:
  backoffLimit: 0
  template:
    metadata: {}
    spec:
      restartPolicy: Never
      containers: []
      volumes: []
"#,
        )
        .unwrap()
    }

    fn accept() -> HashSet<PodPhase> {
        HashSet::from([PodPhase::Completed, PodPhase::Running])
    }

    fn pass_through() -> HashSet<PodPhase> {
        HashSet::from([PodPhase::Pending])
    }

    #[tokio::test]
    async fn test_submit_returns_assigned_name() {
        let api = Arc::new(ReplayApi {
            submitted_name: Some("runner-step-0123abcd".to_string()),
            ..Default::default()
        });
        let name = manager(api).submit_job(&manifest()).await.unwrap();
        assert_eq!(name, "runner-step-0123abcd");
    }

    #[tokio::test]
    async fn test_submit_without_name_is_integrity_error() {
        let api = Arc::new(ReplayApi::default());
        let result = manager(api).submit_job(&manifest()).await;
        assert!(matches!(result, Err(AppError::IntegrityError(_))));
    }

    #[tokio::test]
    async fn test_pod_discovery_retries() {
        let api = Arc::new(ReplayApi {
            pod_names: Mutex::new(VecDeque::from([None, None, Some("pod-1".to_string())])),
            ..Default::default()
        });
        let pod = manager(api).get_container_job_pod_name("job").await.unwrap();
        assert_eq!(pod, "pod-1");
    }

    #[tokio::test]
    async fn test_pod_discovery_times_out() {
        let api = Arc::new(ReplayApi {
            pod_names: Mutex::new(VecDeque::from([None])),
            ..Default::default()
        });
        let result = manager(api).get_container_job_pod_name("job").await;
        assert!(matches!(result, Err(AppError::PollingTimeout { .. })));
    }

    #[tokio::test]
    async fn test_wait_resolves_on_running() {
        let api = Arc::new(ReplayApi {
            phases: Mutex::new(VecDeque::from([
                PodPhase::Pending,
                PodPhase::Pending,
                PodPhase::Running,
                PodPhase::Failed,
            ])),
            ..Default::default()
        });
        let phase = manager(api.clone())
            .wait_for_pod_phases("pod", &accept(), &pass_through())
            .await
            .unwrap();

        assert_eq!(phase, PodPhase::Running);
        assert_eq!(*api.phase_calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_wait_fails_on_disallowed_phase() {
        let api = Arc::new(ReplayApi {
            phases: Mutex::new(VecDeque::from([PodPhase::Pending, PodPhase::Failed])),
            ..Default::default()
        });
        let result = manager(api)
            .wait_for_pod_phases("pod", &accept(), &pass_through())
            .await;

        match result {
            Err(AppError::PodUnhealthy { pod, phase }) => {
                assert_eq!(pod, "pod");
                assert_eq!(phase, "Failed");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_unknown_phase_is_failure() {
        let api = Arc::new(ReplayApi {
            phases: Mutex::new(VecDeque::from([PodPhase::Unknown])),
            ..Default::default()
        });
        let result = manager(api)
            .wait_for_pod_phases("pod", &accept(), &pass_through())
            .await;
        assert!(matches!(result, Err(AppError::PodUnhealthy { .. })));
    }

    #[tokio::test]
    async fn test_wait_times_out_while_pending() {
        let api = Arc::new(ReplayApi {
            phases: Mutex::new(VecDeque::from([PodPhase::Pending])),
            ..Default::default()
        });
        let result = manager(api)
            .wait_for_pod_phases("pod", &accept(), &pass_through())
            .await;
        assert!(matches!(result, Err(AppError::PollingTimeout { .. })));
    }

    #[tokio::test]
    async fn test_job_completion_wait() {
        let api = Arc::new(ReplayApi {
            jobs: Mutex::new(VecDeque::from([
                JobStatus { active: 1, ..Default::default() },
                JobStatus { succeeded: 1, ..Default::default() },
            ])),
            ..Default::default()
        });
        let status = manager(api).wait_for_job_to_complete("job").await.unwrap();
        assert_eq!(status.succeeded, 1);
    }

    #[tokio::test]
    async fn test_failed_job_is_terminal() {
        let api = Arc::new(ReplayApi {
            jobs: Mutex::new(VecDeque::from([JobStatus { failed: 1, ..Default::default() }])),
            ..Default::default()
        });
        let status = manager(api).wait_for_job_to_complete("job").await.unwrap();
        assert_eq!(status.failed, 1);
    }

    #[tokio::test]
    async fn test_cancelled_wait() {
        let api = Arc::new(ReplayApi {
            phases: Mutex::new(VecDeque::from([PodPhase::Pending])),
            ..Default::default()
        });
        let flag = Arc::new(AtomicBool::new(true));
        let result = manager(api)
            .with_cancel_flag(flag)
            .wait_for_pod_phases("pod", &accept(), &pass_through())
            .await;
        assert!(matches!(result, Err(AppError::PollingCancelled(_))));
    }
}

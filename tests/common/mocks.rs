use async_trait::async_trait;
use runner_container_step::ci::connectors::kubernetes::yaml_generator::JobManifest;
use runner_container_step::ci::connectors::traits::{
    ContainerStatus, JobStatus, KubernetesApi, PodPhase, PodStatus, SubmittedWorkload,
};
use runner_container_step::Result;
use std::collections::VecDeque;
use std::sync::Mutex;

/// In-memory platform client replaying scripted answers
///
/// Each queue hands out its entries in order and keeps repeating the last
/// one. Every call is recorded as `"<operation>:<subject>"`.
pub struct ScriptedKubernetesApi {
    echo_submitted_name: bool,
    pod_lookups: Mutex<VecDeque<Option<String>>>,
    phases: Mutex<VecDeque<PodPhase>>,
    job_statuses: Mutex<VecDeque<JobStatus>>,
    final_containers: Vec<ContainerStatus>,
    submitted: Mutex<Vec<JobManifest>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedKubernetesApi {
    /// Pod found at once, `Running` then `Completed`, job succeeded, no
    /// container statuses.
    pub fn new() -> Self {
        Self {
            echo_submitted_name: true,
            pod_lookups: Mutex::new(VecDeque::new()),
            phases: Mutex::new(VecDeque::from([PodPhase::Running, PodPhase::Completed])),
            job_statuses: Mutex::new(VecDeque::from([JobStatus {
                succeeded: 1,
                ..Default::default()
            }])),
            final_containers: Vec::new(),
            submitted: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn without_submitted_name(mut self) -> Self {
        self.echo_submitted_name = false;
        self
    }

    pub fn with_pod_lookups(self, lookups: Vec<Option<&str>>) -> Self {
        *self.pod_lookups.lock().unwrap() =
            lookups.into_iter().map(|l| l.map(str::to_string)).collect();
        self
    }

    pub fn with_phases(self, phases: Vec<PodPhase>) -> Self {
        *self.phases.lock().unwrap() = phases.into();
        self
    }

    pub fn with_job_statuses(self, statuses: Vec<JobStatus>) -> Self {
        *self.job_statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_final_containers(mut self, containers: Vec<ContainerStatus>) -> Self {
        self.final_containers = containers;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| call.split(':').next().unwrap_or_default().to_string())
            .collect()
    }

    pub fn submitted(&self) -> Vec<JobManifest> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, operation: &str, subject: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", operation, subject));
    }
}

fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl KubernetesApi for ScriptedKubernetesApi {
    async fn submit_workload(&self, manifest: &JobManifest) -> Result<SubmittedWorkload> {
        let name = manifest.name().unwrap_or_default().to_string();
        self.record("submit", &name);
        self.submitted.lock().unwrap().push(manifest.clone());

        Ok(SubmittedWorkload {
            name: self.echo_submitted_name.then_some(name),
        })
    }

    async fn get_pod_name_for_workload(&self, job_name: &str) -> Result<Option<String>> {
        self.record("pod_name", job_name);
        Ok(next(&self.pod_lookups).unwrap_or_else(|| Some(format!("{}-pod", job_name))))
    }

    async fn get_pod_status(&self, pod_name: &str) -> Result<PodStatus> {
        self.record("pod_status", pod_name);
        Ok(PodStatus {
            phase: next(&self.phases).unwrap_or(PodPhase::Unknown),
            container_statuses: self.final_containers.clone(),
        })
    }

    async fn stream_logs(&self, pod_name: &str, container_name: &str) -> Result<()> {
        self.record("logs", &format!("{}/{}", pod_name, container_name));
        Ok(())
    }

    async fn get_workload_status(&self, job_name: &str) -> Result<JobStatus> {
        self.record("job_status", job_name);
        Ok(next(&self.job_statuses).unwrap_or_default())
    }
}

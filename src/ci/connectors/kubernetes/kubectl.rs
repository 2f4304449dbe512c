//! kubectl-backed platform client
//!
//! Implements [`KubernetesApi`] by shelling out to `kubectl` and parsing its
//! JSON output.

use super::yaml_generator::JobManifest;
use crate::ci::connectors::traits::{
    ContainerStatus, JobStatus, KubernetesApi, PodPhase, PodStatus, SubmittedWorkload,
    TerminatedState,
};
use crate::config::RunnerConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::process::{Output, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::{debug, error};

pub struct KubectlClient {
    kubectl_path: String,
    namespace: String,
}

impl KubectlClient {
    pub fn new(kubectl_path: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kubectl_path: kubectl_path.into(),
            namespace: namespace.into(),
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(config.kubectl_path.clone(), config.namespace.clone())
    }

    /// Run kubectl in the configured namespace, optionally feeding `stdin`.
    async fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<Output> {
        let mut cmd = Command::new(&self.kubectl_path);
        cmd.args(args).args(["-n", self.namespace.as_str()]);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(|e| {
            AppError::KubernetesError(format!("Failed to spawn kubectl {}: {}", args[0], e))
        })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await.map_err(|e| {
                AppError::KubernetesError(format!("Failed to write manifest to kubectl: {}", e))
            })?;
            pipe.shutdown().await.map_err(|e| {
                AppError::KubernetesError(format!("Failed to close kubectl stdin: {}", e))
            })?;
        }

        let output = child.wait_with_output().await.map_err(|e| {
            AppError::KubernetesError(format!("Failed to wait for kubectl {}: {}", args[0], e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::KubernetesError(format!(
                "kubectl {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(output)
    }

    async fn run_json(&self, args: &[&str], stdin: Option<&str>) -> Result<Value> {
        let output = self.run(args, stdin).await?;
        serde_json::from_slice(&output.stdout).map_err(|e| {
            AppError::KubernetesError(format!("Failed to parse kubectl output as JSON: {}", e))
        })
    }

    fn parse_submitted(created: &Value) -> SubmittedWorkload {
        SubmittedWorkload {
            name: created
                .pointer("/metadata/name")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        }
    }

    fn parse_pod_name(job_name: &str, pods: &Value) -> Result<Option<String>> {
        let first = match pods
            .get("items")
            .and_then(|items| items.as_array())
            .and_then(|items| items.first())
        {
            Some(first) => first,
            None => return Ok(None),
        };

        first
            .pointer("/metadata/name")
            .and_then(|v| v.as_str())
            .map(|name| Some(name.to_string()))
            .ok_or_else(|| {
                AppError::KubernetesError(format!(
                    "Failed to determine the name of the pod for job {}",
                    job_name
                ))
            })
    }

    fn parse_pod_status(pod: &Value) -> PodStatus {
        let status = pod.get("status").unwrap_or(&Value::Null);

        let phase = status
            .get("phase")
            .and_then(|v| v.as_str())
            .map(PodPhase::from_platform)
            .unwrap_or(PodPhase::Unknown);

        let container_statuses = status
            .get("containerStatuses")
            .and_then(|v| v.as_array())
            .map(|statuses| statuses.iter().map(Self::parse_container_status).collect())
            .unwrap_or_default();

        PodStatus {
            phase,
            container_statuses,
        }
    }

    fn parse_container_status(status: &Value) -> ContainerStatus {
        ContainerStatus {
            name: status
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            terminated: status
                .pointer("/state/terminated")
                .filter(|v| v.is_object())
                .map(|terminated| TerminatedState {
                    exit_code: terminated.get("exitCode").and_then(parse_exit_code),
                }),
        }
    }

    fn parse_job_status(job: &Value) -> JobStatus {
        let status = job.get("status").unwrap_or(&Value::Null);
        let counter = |key: &str| status.get(key).and_then(|v| v.as_i64()).unwrap_or(0) as i32;

        JobStatus {
            active: counter("active"),
            succeeded: counter("succeeded"),
            failed: counter("failed"),
        }
    }
}

/// Numeric or numeric-string exit codes; anything else is absent.
fn parse_exit_code(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

#[async_trait]
impl KubernetesApi for KubectlClient {
    async fn submit_workload(&self, manifest: &JobManifest) -> Result<SubmittedWorkload> {
        let yaml = manifest.to_yaml()?;
        debug!("📝 Job YAML:\n{}", yaml);

        let created = self
            .run_json(&["create", "-f", "-", "-o", "json"], Some(&yaml))
            .await?;
        Ok(Self::parse_submitted(&created))
    }

    async fn get_pod_name_for_workload(&self, job_name: &str) -> Result<Option<String>> {
        let selector = format!("job-name={}", job_name);
        let pods = self
            .run_json(&["get", "pods", "-l", &selector, "-o", "json"], None)
            .await?;
        Self::parse_pod_name(job_name, &pods)
    }

    async fn get_pod_status(&self, pod_name: &str) -> Result<PodStatus> {
        let pod = self
            .run_json(&["get", "pod", pod_name, "-o", "json"], None)
            .await?;
        Ok(Self::parse_pod_status(&pod))
    }

    async fn stream_logs(&self, pod_name: &str, container_name: &str) -> Result<()> {
        let mut child = Command::new(&self.kubectl_path)
            .args(["logs", "-f", pod_name, "-c", container_name, "-n", self.namespace.as_str()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AppError::KubernetesError(format!("Failed to spawn kubectl logs: {}", e))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            AppError::KubernetesError("kubectl logs stdout was not captured".to_string())
        })?;
        let stderr_pipe = child.stderr.take().ok_or_else(|| {
            AppError::KubernetesError("kubectl logs stderr was not captured".to_string())
        })?;

        // stderr is drained concurrently with stdout.
        let stderr_task = tokio::spawn(async move {
            let mut stderr = String::new();
            let mut pipe = stderr_pipe;
            pipe.read_to_string(&mut stderr).await.map(|_| stderr)
        });

        let mut lines = LinesStream::new(BufReader::new(stdout).lines());
        let mut out = tokio::io::stdout();
        while let Some(line) = lines.next().await {
            let line = line?;
            out.write_all(line.as_bytes()).await?;
            out.write_all(b"\n").await?;
        }
        out.flush().await?;

        let status = child.wait().await?;
        let stderr = stderr_task.await.map_err(|e| {
            AppError::InternalServerError(format!("kubectl logs stderr reader failed: {}", e))
        })??;

        if !status.success() {
            error!("❌ Failed to stream logs from pod {}: {}", pod_name, stderr.trim());
            return Err(AppError::KubernetesError(format!(
                "Failed to stream logs from pod {}: {}",
                pod_name,
                stderr.trim()
            )));
        }

        Ok(())
    }

    async fn get_workload_status(&self, job_name: &str) -> Result<JobStatus> {
        let job = self
            .run_json(&["get", "job", job_name, "-o", "json"], None)
            .await?;
        Ok(Self::parse_job_status(&job))
    }
}

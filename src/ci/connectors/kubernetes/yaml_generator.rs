//! Workload manifest building
//!
//! Assembles the step container from a [`StepDescriptor`] and its entry-point
//! script, wraps it in a Job manifest and renders that manifest as YAML for
//! the platform client.

use super::entrypoint::EntryPointScript;
use super::naming::RunnerInstanceLabel;
use crate::ci::config::StepDescriptor;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Name used to pick the step's own container out of the pod.
pub const JOB_CONTAINER_NAME: &str = "job";
pub const POD_VOLUME_NAME: &str = "work";

const WORK_MOUNT_PATH: &str = "/__w";
const WORKSPACE_MARKER: &str = "_work/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sub_path: Option<String>,
}

impl VolumeMount {
    fn work(mount_path: &str, sub_path: Option<&str>) -> Self {
        Self {
            name: POD_VOLUME_NAME.to_string(),
            mount_path: mount_path.to_string(),
            sub_path: sub_path.map(str::to_string),
        }
    }
}

/// The container the step runs in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub env: Vec<EnvVar>,
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimSource {
    pub claim_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub persistent_volume_claim: PersistentVolumeClaimSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    pub restart_policy: String,
    pub containers: Vec<ContainerSpec>,
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodTemplate {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub backoff_limit: i32,
    pub template: PodTemplate,
}

/// A `batch/v1` Job carrying a single step container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobManifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: JobSpec,
}

impl JobManifest {
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Kubernetes manifest generator for container steps
pub struct KubernetesYamlGenerator;

impl KubernetesYamlGenerator {
    /// Build the step container. Pure apart from logging.
    pub fn build_container_spec(
        step: &StepDescriptor,
        script: &EntryPointScript,
        volume_mounts: Vec<VolumeMount>,
    ) -> Result<ContainerSpec> {
        step.validate()?;

        debug!("🏗️ Building container spec for image: {}", step.image);

        Ok(ContainerSpec {
            name: JOB_CONTAINER_NAME.to_string(),
            image: step.image.clone(),
            command: Self::build_command(script),
            env: Self::build_environment_variables(step),
            volume_mounts,
        })
    }

    /// Custom entry points live inside the script; the command never changes.
    pub fn build_command(script: &EntryPointScript) -> Vec<String> {
        vec![
            "sh".to_string(),
            "-l".to_string(),
            script.container_path.clone(),
        ]
    }

    /// `HOME` comes from the image; unset and empty values are dropped.
    pub fn build_environment_variables(step: &StepDescriptor) -> Vec<EnvVar> {
        step.environment_variables
            .iter()
            .filter(|(key, _)| key.as_str() != "HOME")
            .filter_map(|(key, value)| match value.as_deref() {
                Some(value) if !value.is_empty() => Some(EnvVar {
                    name: key.clone(),
                    value: value.to_string(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Mount set for container actions, all carved out of the `work` volume.
    pub fn container_volumes(github_workspace: Option<&str>) -> Vec<VolumeMount> {
        let mut mounts = vec![VolumeMount::work(WORK_MOUNT_PATH, None)];

        if let Some(relative) = github_workspace.and_then(workspace_relative_path) {
            mounts.push(VolumeMount::work("/github/workspace", Some(relative)));
        }

        mounts.push(VolumeMount::work(
            "/github/file_commands",
            Some("_temp/_runner_file_commands"),
        ));
        mounts.push(VolumeMount::work("/github/home", Some("_temp/_github_home")));
        mounts.push(VolumeMount::work(
            "/github/workflow",
            Some("_temp/_github_workflow"),
        ));
        mounts
    }

    /// Wrap the container in a single-attempt Job.
    pub fn generate_job_manifest(
        job_name: &str,
        container: ContainerSpec,
        label: &RunnerInstanceLabel,
        claim_name: &str,
    ) -> JobManifest {
        let mut labels = BTreeMap::new();
        labels.insert(label.key().to_string(), label.value().to_string());

        JobManifest {
            api_version: "batch/v1".to_string(),
            kind: "Job".to_string(),
            metadata: ObjectMeta {
                name: Some(job_name.to_string()),
                labels: labels.clone(),
            },
            spec: JobSpec {
                backoff_limit: 0,
                template: PodTemplate {
                    metadata: ObjectMeta { name: None, labels },
                    spec: PodSpec {
                        restart_policy: "Never".to_string(),
                        containers: vec![container],
                        volumes: vec![Volume {
                            name: POD_VOLUME_NAME.to_string(),
                            persistent_volume_claim: PersistentVolumeClaimSource {
                                claim_name: claim_name.to_string(),
                            },
                        }],
                    },
                },
            },
        }
    }
}

fn workspace_relative_path(workspace: &str) -> Option<&str> {
    workspace
        .rfind(WORKSPACE_MARKER)
        .map(|i| &workspace[i + WORKSPACE_MARKER.len()..])
        .filter(|relative| !relative.is_empty())
}

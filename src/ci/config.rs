use crate::error::{AppError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hook command handled by this binary.
pub const RUN_CONTAINER_STEP_COMMAND: &str = "run_container_step";

/// Declarative description of a single container step.
///
/// Unknown keys are rejected when the descriptor is deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StepDescriptor {
    pub image: String,
    #[serde(default)]
    pub entry_point: Option<String>,
    #[serde(default)]
    pub entry_point_args: Option<Vec<String>>,
    pub working_directory: String,
    /// Insertion order is kept so the rendered env list is deterministic.
    /// `null` values are accepted and dropped from the container env.
    #[serde(default)]
    pub environment_variables: IndexMap<String, Option<String>>,
    #[serde(default)]
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub prepend_path: Vec<String>,
    // Sent by the runner with every container step; accepted, not applied.
    #[serde(default, skip_serializing)]
    pub registry: Option<Value>,
    #[serde(default, skip_serializing)]
    pub create_options: Option<Value>,
    #[serde(default, skip_serializing)]
    pub port_mappings: Option<Value>,
    #[serde(default, skip_serializing)]
    pub user_mount_volumes: Option<Value>,
    #[serde(default, skip_serializing)]
    pub system_mount_volumes: Option<Value>,
}

impl StepDescriptor {
    pub fn new(image: impl Into<String>, working_directory: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            entry_point: None,
            entry_point_args: None,
            working_directory: working_directory.into(),
            environment_variables: IndexMap::new(),
            dockerfile: None,
            prepend_path: Vec::new(),
            registry: None,
            create_options: None,
            port_mappings: None,
            user_mount_volumes: None,
            system_mount_volumes: None,
        }
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>, args: Vec<String>) -> Self {
        self.entry_point = Some(entry_point.into());
        self.entry_point_args = Some(args);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables
            .insert(key.into(), Some(value.into()));
        self
    }

    pub fn with_dockerfile(mut self, dockerfile: impl Into<String>) -> Self {
        self.dockerfile = Some(dockerfile.into());
        self
    }

    /// Reject descriptors this orchestrator cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.dockerfile.is_some() {
            return Err(AppError::UnsupportedFeature(
                "Building container actions is not currently supported".to_string(),
            ));
        }

        if self.image.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Container step requires image to be specified".to_string(),
            ));
        }

        Ok(())
    }
}

/// Envelope the runner writes to the hook's stdin.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookInput {
    pub command: String,
    #[serde(default)]
    pub response_file: Option<String>,
    pub args: Value,
    #[serde(default)]
    pub state: Option<Value>,
}

impl HookInput {
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Extract the step descriptor, failing for any other hook command.
    pub fn into_step(self) -> Result<StepDescriptor> {
        if self.command != RUN_CONTAINER_STEP_COMMAND {
            return Err(AppError::ValidationError(format!(
                "Unsupported hook command '{}', expected '{}'",
                self.command, RUN_CONTAINER_STEP_COMMAND
            )));
        }

        Ok(serde_json::from_value(self.args)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::connectors::kubernetes::yaml_generator::{EnvVar, KubernetesYamlGenerator};

    #[test]
    fn test_descriptor_from_hook_input() {
        let input = r#"{
            "command": "run_container_step",
            "responseFile": "/tmp/response.json",
            "args": {
                "image": "alpine",
                "workingDirectory": "/__w/repo/repo",
                "environmentVariables": {"HOME": "/root", "FOO": "bar"}
            },
            "state": {}
        }"#;

        let step = HookInput::from_json(input).unwrap().into_step().unwrap();
        assert_eq!(step.image, "alpine");
        assert_eq!(step.entry_point, None);
        assert_eq!(step.entry_point_args, None);
        assert_eq!(step.working_directory, "/__w/repo/repo");
        let keys: Vec<&str> = step.environment_variables.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["HOME", "FOO"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let input = r#"{
            "command": "run_container_step",
            "args": {"image": "alpine", "workingDirectory": "/w", "networkMode": "host"}
        }"#;

        let result = HookInput::from_json(input).unwrap().into_step();
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_runner_step_options_accepted() {
        let input = r#"{
            "command": "run_container_step",
            "args": {
                "image": "alpine",
                "workingDirectory": "/w",
                "registry": null,
                "createOptions": "--cpus 2",
                "portMappings": [],
                "userMountVolumes": [{"sourceVolumePath": "/cache", "targetVolumePath": "/cache"}],
                "systemMountVolumes": []
            }
        }"#;

        let step = HookInput::from_json(input).unwrap().into_step().unwrap();
        assert_eq!(step.image, "alpine");
        assert_eq!(step.registry, None);
        assert!(step.user_mount_volumes.is_some());
    }

    #[test]
    fn test_null_environment_value_dropped() {
        let input = r#"{
            "command": "run_container_step",
            "args": {
                "image": "alpine",
                "workingDirectory": "/w",
                "environmentVariables": {"FOO": "bar", "UNSET": null}
            }
        }"#;

        let step = HookInput::from_json(input).unwrap().into_step().unwrap();
        assert_eq!(step.environment_variables["UNSET"], None);

        let env = KubernetesYamlGenerator::build_environment_variables(&step);
        assert_eq!(
            env,
            vec![EnvVar {
                name: "FOO".to_string(),
                value: "bar".to_string(),
            }]
        );
    }

    #[test]
    fn test_other_command_rejected() {
        let input = r#"{"command": "prepare_job", "args": {}}"#;
        let err = HookInput::from_json(input).unwrap().into_step().unwrap_err();
        assert!(err.to_string().contains("prepare_job"));
    }

    #[test]
    fn test_dockerfile_rejected() {
        let step = StepDescriptor::new("alpine", "/w").with_dockerfile("Dockerfile");
        assert!(matches!(
            step.validate(),
            Err(AppError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_empty_image_rejected() {
        let step = StepDescriptor::new("  ", "/w");
        assert!(matches!(step.validate(), Err(AppError::ValidationError(_))));
        assert!(StepDescriptor::new("alpine", "/w").validate().is_ok());
    }
}

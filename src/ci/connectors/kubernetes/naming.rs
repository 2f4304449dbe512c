//! Resource name generation
//!
//! Names are derived from the runner identity. The base is truncated so the
//! role suffix and random suffix always survive the platform length limit.

use crate::config::RunnerConfig;
use uuid::Uuid;

pub const MAX_POD_NAME_LENGTH: usize = 63;
pub const STEP_POD_NAME_SUFFIX_LENGTH: usize = 8;

const WORKFLOW_SUFFIX: &str = "-workflow";
const STEP_SUFFIX: &str = "-step-";
const SECRET_SUFFIX: &str = "-secret-";

/// Label attached to every resource created for a runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerInstanceLabel {
    runner_pod_name: String,
}

impl RunnerInstanceLabel {
    pub fn new(runner_pod_name: impl Into<String>) -> Self {
        Self {
            runner_pod_name: runner_pod_name.into(),
        }
    }

    pub fn key(&self) -> &str {
        "runner-pod"
    }

    pub fn value(&self) -> &str {
        &self.runner_pod_name
    }
}

impl std::fmt::Display for RunnerInstanceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key(), self.value())
    }
}

#[derive(Debug, Clone)]
pub struct NameGenerator {
    runner_pod_name: String,
    volume_claim_name: String,
}

impl NameGenerator {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            runner_pod_name: config.runner_pod_name.clone(),
            volume_claim_name: config.volume_claim_name.clone(),
        }
    }

    pub fn volume_claim_name(&self) -> &str {
        &self.volume_claim_name
    }

    pub fn runner_label(&self) -> RunnerInstanceLabel {
        RunnerInstanceLabel::new(self.runner_pod_name.clone())
    }

    /// Name of the job pod shared by the whole workflow run.
    pub fn job_pod_name(&self) -> String {
        format!(
            "{}{}",
            truncate_base(&self.runner_pod_name, MAX_POD_NAME_LENGTH - WORKFLOW_SUFFIX.len()),
            WORKFLOW_SUFFIX
        )
    }

    pub fn step_pod_name(&self) -> String {
        self.with_random_suffix(STEP_SUFFIX)
    }

    pub fn secret_name(&self) -> String {
        self.with_random_suffix(SECRET_SUFFIX)
    }

    fn with_random_suffix(&self, role: &str) -> String {
        let budget = MAX_POD_NAME_LENGTH - (role.len() + STEP_POD_NAME_SUFFIX_LENGTH);
        format!(
            "{}{}{}",
            truncate_base(&self.runner_pod_name, budget),
            role,
            random_suffix()
        )
    }
}

/// First characters of a v4 UUID; collision avoidance only.
fn random_suffix() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(STEP_POD_NAME_SUFFIX_LENGTH);
    id
}

/// Cut `base` to at most `max_len` bytes without splitting a character.
fn truncate_base(base: &str, max_len: usize) -> &str {
    if base.len() <= max_len {
        return base;
    }
    let mut end = max_len;
    while !base.is_char_boundary(end) {
        end -= 1;
    }
    &base[..end]
}

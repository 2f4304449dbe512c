#![allow(dead_code)]

// Test utilities and common setup
pub mod mocks;

pub use mocks::*;

use runner_container_step::RunnerConfig;
use std::path::Path;
use std::time::Duration;

pub const RUNNER_POD_NAME: &str = "arc-runner-7x9kq";
pub const RUNNER_CLAIM_NAME: &str = "arc-runner-7x9kq-work";

/// Runner configuration with millisecond polling, scripts written to `temp`.
pub fn test_config(temp: &Path) -> RunnerConfig {
    let mut config = RunnerConfig::from_vars([
        ("ACTIONS_RUNNER_POD_NAME", RUNNER_POD_NAME),
        ("ACTIONS_RUNNER_CLAIM_NAME", RUNNER_CLAIM_NAME),
        ("GITHUB_WORKSPACE", "/home/runner/_work/repo/repo"),
    ])
    .expect("test configuration");

    config.runner_temp = temp.to_path_buf();
    config.poll_interval = Duration::from_millis(1);
    config.pod_discovery_timeout = Duration::from_millis(500);
    config.pod_phase_timeout = Duration::from_millis(500);
    config.job_completion_timeout = Duration::from_millis(500);
    config
}

//! Kubernetes connector module
//!
//! Runs a single CI container step as an ephemeral Kubernetes Job and reports
//! the step's exit code. Components, leaves first: resource naming,
//! entry-point scripts, manifest generation, polling, job lifecycle, and the
//! orchestrating connector.

pub mod connector;
pub mod entrypoint;
pub mod job_manager;
pub mod kubectl;
pub mod naming;
pub mod polling;
pub mod yaml_generator;

pub use connector::{exit_code_from_status, KubernetesConnector};
pub use kubectl::KubectlClient;
pub use naming::NameGenerator;

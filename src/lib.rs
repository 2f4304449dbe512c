//! runner-container-step - runs a CI container step as a Kubernetes Job
//!
//! This library provides the container-step orchestrator used by the
//! self-hosted runner hook: resource naming, entry-point scripts, Job
//! manifest generation, pod phase waiting and exit code extraction.

pub mod ci;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use ci::connectors::KubernetesConnector;
pub use ci::StepDescriptor;
pub use config::RunnerConfig;
pub use error::{AppError, Result};

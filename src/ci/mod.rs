pub mod config;
pub mod connectors;

pub use config::{HookInput, StepDescriptor};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Integrity error: {0}")]
    IntegrityError(String),

    #[error("Pod {pod} is unhealthy with phase status {phase}")]
    PodUnhealthy { pod: String, phase: String },

    #[error("Timed out after {seconds} seconds waiting for {what}")]
    PollingTimeout { what: String, seconds: u64 },

    #[error("Polling cancelled while waiting for {0}")]
    PollingCancelled(String),

    #[error("Kubernetes error: {0}")]
    KubernetesError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalServerError(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::ValidationError(format!("YAML error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

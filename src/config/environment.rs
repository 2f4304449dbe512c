use crate::error::{AppError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Suffix appended to every missing-variable message.
const ADMINISTRATOR_HINT: &str = "please contact your self hosted runner administrator";

/// Environment configuration loader
///
/// Reads variables from an explicit source map so that the process
/// environment is consulted exactly once, when the loader is built.
pub struct EnvironmentLoader {
    source: HashMap<String, String>,
    required_vars: Vec<String>,
    optional_vars: HashMap<String, String>, // var_name -> default_value
}

impl EnvironmentLoader {
    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            source: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            required_vars: Vec::new(),
            optional_vars: HashMap::new(),
        }
    }

    pub fn require_var(mut self, var_name: &str) -> Self {
        self.required_vars.push(var_name.to_string());
        self
    }

    pub fn optional_var(mut self, var_name: &str, default_value: &str) -> Self {
        self.optional_vars
            .insert(var_name.to_string(), default_value.to_string());
        self
    }

    /// Load and validate all declared variables.
    ///
    /// A required variable that is present but empty counts as missing.
    pub fn load(&self) -> Result<EnvironmentConfig> {
        let mut config = EnvironmentConfig {
            variables: HashMap::new(),
        };

        for var_name in &self.required_vars {
            match self.source.get(var_name).filter(|v| !v.is_empty()) {
                Some(value) => {
                    config.variables.insert(var_name.clone(), value.clone());
                }
                None => {
                    return Err(AppError::ConfigError(format!(
                        "'{}' env is required, {}",
                        var_name, ADMINISTRATOR_HINT
                    )));
                }
            }
        }

        for (var_name, default_value) in &self.optional_vars {
            let value = self
                .source
                .get(var_name)
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| default_value.clone());
            config.variables.insert(var_name.clone(), value);
        }

        debug!(
            required_vars = self.required_vars.len(),
            optional_vars = self.optional_vars.len(),
            "🌍 Environment configuration loaded"
        );

        Ok(config)
    }
}

/// Environment configuration container
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub variables: HashMap<String, String>,
}

impl EnvironmentConfig {
    /// Returns a declared variable, with empty optional defaults read as unset.
    pub fn get_non_empty(&self, key: &str) -> Option<String> {
        self.variables.get(key).filter(|v| !v.is_empty()).cloned()
    }

    pub fn get_or_default(&self, key: &str, default: &str) -> String {
        self.variables
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_int<T>(&self, key: &str) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.variables.get(key) {
            Some(value) => value.trim().parse::<T>().map_err(|e| {
                AppError::ConfigError(format!("Invalid integer value for '{}': {}", key, e))
            }),
            None => Err(AppError::ConfigError(format!(
                "Environment variable '{}' not found",
                key
            ))),
        }
    }
}

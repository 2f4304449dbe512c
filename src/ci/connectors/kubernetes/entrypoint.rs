//! Entry-point script materialization
//!
//! A step's entry point and arguments are written into a shell script on the
//! shared work volume, so every container is started the same way:
//! `sh -l <script>`.

use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_CONTAINER_ENTRY_POINT: &str = "tail";
pub const DEFAULT_CONTAINER_ENTRY_POINT_ARGS: [&str; 2] = ["-f", "/dev/null"];

/// Where the runner temp directory appears inside step containers.
pub const CONTAINER_TEMP_PATH: &str = "/__w/_temp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointScript {
    /// Path on the runner side of the shared volume.
    pub runner_path: PathBuf,
    /// Path the step container sees.
    pub container_path: String,
}

/// Entry point and arguments after defaults have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntryPoint {
    pub entry_point: String,
    pub args: Vec<String>,
}

impl ResolvedEntryPoint {
    /// A missing entry point falls back to the default invocation; a custom
    /// entry point without arguments runs with none.
    pub fn resolve(entry_point: Option<&str>, args: Option<&[String]>) -> Self {
        match entry_point.filter(|e| !e.is_empty()) {
            Some(entry_point) => Self {
                entry_point: entry_point.to_string(),
                args: args.map(|a| a.to_vec()).unwrap_or_default(),
            },
            None => Self {
                entry_point: DEFAULT_CONTAINER_ENTRY_POINT.to_string(),
                args: DEFAULT_CONTAINER_ENTRY_POINT_ARGS
                    .iter()
                    .map(|a| a.to_string())
                    .collect(),
            },
        }
    }
}

pub struct EntryPointWriter {
    runner_temp: PathBuf,
}

impl EntryPointWriter {
    pub fn new(runner_temp: impl AsRef<Path>) -> Self {
        Self {
            runner_temp: runner_temp.as_ref().to_path_buf(),
        }
    }

    /// Render the script body. Pure; the same inputs give the same script.
    pub fn render(
        working_directory: &str,
        entry_point: &ResolvedEntryPoint,
        prepend_path: &[String],
    ) -> String {
        let mut script = String::from("#!/bin/sh -l\n");

        if !prepend_path.is_empty() {
            let joined = prepend_path.join(":");
            script.push_str(&format!("export PATH={}:\"$PATH\"\n", shell_quote(&joined)));
        }

        let mut command = vec![shell_quote(&entry_point.entry_point)];
        command.extend(entry_point.args.iter().map(|a| shell_quote(a)));

        script.push_str(&format!(
            "cd {} && \\\nexec {}\n",
            shell_quote(working_directory),
            command.join(" ")
        ));
        script
    }

    /// Write a fresh script for one step and return both of its paths.
    pub async fn write(
        &self,
        working_directory: &str,
        entry_point: &ResolvedEntryPoint,
        prepend_path: &[String],
    ) -> Result<EntryPointScript> {
        let content = Self::render(working_directory, entry_point, prepend_path);
        let filename = format!("{}.sh", Uuid::new_v4());
        let runner_path = self.runner_temp.join(&filename);

        fs::create_dir_all(&self.runner_temp).await.map_err(|e| {
            AppError::InternalServerError(format!(
                "Failed to create runner temp directory {}: {}",
                self.runner_temp.display(),
                e
            ))
        })?;

        fs::write(&runner_path, content).await.map_err(|e| {
            AppError::InternalServerError(format!(
                "Failed to write entry point script {}: {}",
                runner_path.display(),
                e
            ))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&runner_path, std::fs::Permissions::from_mode(0o755)).await?;
        }

        let container_path = format!("{}/{}", CONTAINER_TEMP_PATH, filename);
        debug!(
            "📝 Entry point script written: {} (container path {})",
            runner_path.display(),
            container_path
        );

        Ok(EntryPointScript {
            runner_path,
            container_path,
        })
    }
}

/// POSIX single-quote a token for `sh`.
fn shell_quote(token: &str) -> String {
    format!("'{}'", token.replace('\'', r"'\''"))
}

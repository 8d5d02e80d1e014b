//! Build collaborator
//!
//! Turning a source tree into a deployable directory is delegated to an
//! external command. The output directory must end up containing the entry
//! library and exactly one artifact manifest.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::PackageError;
use crate::process::run_tool;

/// Inputs of a single build
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    /// Root of the checked-out or local source tree
    pub source_dir: &'a Path,
    /// Entry point file, already joined onto `source_dir`
    pub entrypoint: &'a Path,
    /// Fresh, empty directory receiving the build output
    pub output_dir: &'a Path,
    /// Source description used in error messages (credentials removed)
    pub origin: &'a str,
}

/// Builds a package source tree into a deployable directory
#[async_trait]
pub trait PackageBuilder: Send + Sync {
    async fn build(
        &self,
        request: BuildRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), PackageError>;
}

/// Builder that runs a configurable command inside the source directory.
///
/// Arguments may contain the placeholders `{entrypoint}`, `{output}` and
/// `{source}`. The default runs the entry point as a shell script:
/// `sh {entrypoint} {output}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBuilder {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self {
            program: "sh".to_string(),
            args: vec!["{entrypoint}".to_string(), "{output}".to_string()],
        }
    }
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn expand_args(&self, request: &BuildRequest<'_>) -> Vec<String> {
        let entrypoint = request.entrypoint.to_string_lossy();
        let output = request.output_dir.to_string_lossy();
        let source = request.source_dir.to_string_lossy();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{entrypoint}", &entrypoint)
                    .replace("{output}", &output)
                    .replace("{source}", &source)
            })
            .collect()
    }
}

#[async_trait]
impl PackageBuilder for CommandBuilder {
    async fn build(
        &self,
        request: BuildRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), PackageError> {
        if !request.entrypoint.is_file() {
            return Err(PackageError::PathNotFound {
                path: request.entrypoint.to_path_buf(),
            });
        }

        tokio::fs::create_dir_all(request.output_dir).await?;

        let mut command = Command::new(&self.program);
        command
            .args(self.expand_args(&request))
            .current_dir(request.source_dir);

        tracing::debug!(
            program = %self.program,
            entrypoint = %request.entrypoint.display(),
            output = %request.output_dir.display(),
            "Building package"
        );

        run_tool(
            command,
            || format!("Unable to build package {}", request.origin),
            cancel,
        )
        .await?;

        Ok(())
    }
}

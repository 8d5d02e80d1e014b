//! External tool invocation

use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::PackageError;

/// Run an external tool to completion and return its standard output.
///
/// The child is killed if `cancel` fires while waiting. A non-zero exit
/// becomes [`PackageError::ExternalTool`] carrying the captured stderr and
/// the message produced by `context`.
pub(crate) async fn run_tool(
    mut command: Command,
    context: impl FnOnce() -> String,
    cancel: &CancellationToken,
) -> Result<String, PackageError> {
    let program = command.as_std().get_program().to_owned();
    let tool = program.to_string_lossy().into_owned();

    if cancel.is_cancelled() {
        return Err(PackageError::Cancelled);
    }

    which::which(&program).map_err(|_| PackageError::ToolNotInstalled { tool: tool.clone() })?;

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(tool = %tool, "Spawning external tool");
    let child = command.spawn()?;

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(tool = %tool, "External tool cancelled");
            return Err(PackageError::Cancelled);
        }
        output = child.wait_with_output() => output?,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::debug!(tool = %tool, code = ?output.status.code(), "External tool failed");
        return Err(PackageError::ExternalTool {
            tool,
            context: context(),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_tool_captures_stdout() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo hello"]);

        let out = run_tool(command, || "unused".into(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_tool_failure_carries_stderr() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo 'bad things' >&2; exit 3"]);

        let err = run_tool(command, || "Unable to do it".into(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExternalTool);
        let msg = err.to_string();
        assert!(msg.contains("Unable to do it"));
        assert!(msg.contains("bad things"));
    }

    #[tokio::test]
    async fn test_run_tool_missing_program() {
        let command = Command::new("hive-definitely-not-a-real-tool");
        let err = run_tool(command, || "x".into(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::ToolNotInstalled { .. }));
    }

    #[tokio::test]
    async fn test_run_tool_cancelled() {
        let mut command = Command::new("sh");
        command.args(["-c", "sleep 30"]);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(10),
            run_tool(command, || "x".into(), &cancel),
        )
        .await
        .expect("cancellation should stop the wait")
        .unwrap_err();
        assert!(err.is_cancelled());
    }
}

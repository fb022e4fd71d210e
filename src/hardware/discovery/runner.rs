//! External Tool Runner
//!
//! Runs the discovery and locate tools as child processes with a hard
//! timeout. A child that outlives the timeout is killed.

use crate::domain::ports::ToolRunner;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs tools on the local host
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<String> {
        debug!(program, ?args, "running tool");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::ToolNotFound {
                    tool: program.to_string(),
                },
                _ => Error::ToolFailed {
                    tool: program.to_string(),
                    reason: e.to_string(),
                },
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::ToolTimeout {
                tool: program.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| Error::ToolFailed {
                tool: program.to_string(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // sas2ircu reports its errors on stdout
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            warn!(program, status = %output.status, "tool exited with failure");
            return Err(Error::ToolFailed {
                tool: program.to_string(),
                reason: format!("{}: {}", output.status, detail),
            });
        }

        Ok(stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_captures_stdout() {
        let runner = ProcessRunner::new(Duration::from_secs(5));
        let out = runner
            .run("sh", &["-c".into(), "echo pool: tank".into()])
            .await
            .unwrap();
        assert_eq!(out.trim(), "pool: tank");
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let runner = ProcessRunner::new(Duration::from_secs(5));
        let err = runner
            .run("/nonexistent/diskmap-tool", &[])
            .await
            .unwrap_err();
        assert_matches!(err, Error::ToolNotFound { .. });
    }

    #[tokio::test]
    async fn test_hung_tool_times_out() {
        let runner = ProcessRunner::new(Duration::from_millis(100));
        let err = runner
            .run("sh", &["-c".into(), "sleep 5".into()])
            .await
            .unwrap_err();
        assert_matches!(err, Error::ToolTimeout { .. });
        assert!(err.is_tool_failure());
    }

    #[tokio::test]
    async fn test_failure_without_output() {
        let runner = ProcessRunner::new(Duration::from_secs(5));
        let err = runner
            .run("sh", &["-c".into(), "echo broken >&2; exit 3".into()])
            .await
            .unwrap_err();
        assert_matches!(err, Error::ToolFailed { ref reason, .. } if reason.contains("broken"));
    }

    #[tokio::test]
    async fn test_failure_with_banner_on_stdout() {
        let runner = ProcessRunner::new(Duration::from_secs(5));
        let script = "echo 'LSI Corporation SAS2 IR Configuration Utility.'; \
                      echo 'SAS2IRCU: Error executing command DISPLAY.'; exit 1";
        let err = runner
            .run("sh", &["-c".into(), script.into()])
            .await
            .unwrap_err();
        assert_matches!(
            err,
            Error::ToolFailed { ref reason, .. } if reason.contains("Error executing command DISPLAY")
        );
        assert!(err.is_tool_failure());
    }
}

//! Subprocess invocation with a bounded timeout.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Default per-invocation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors that can occur while running an external tool.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("{0} not installed")]
    NotInstalled(String),
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// None when the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
            (false, true) => self.stdout.clone(),
            _ => self.stderr.clone(),
        }
    }

    /// A short excerpt for synthetic error messages.
    pub fn excerpt(&self) -> String {
        let text = self.combined();
        let text = text.trim();
        if text.chars().count() > 500 {
            let head: String = text.chars().take(500).collect();
            format!("{}...", head)
        } else {
            text.to_string()
        }
    }

    /// Whether a package-runner wrapper (npx, pnpm exec) reported that
    /// the tool itself is missing.
    pub fn reports_missing_tool(&self) -> bool {
        let stderr = self.stderr.to_lowercase();
        self.code != Some(0)
            && (stderr.contains("could not determine executable to run")
                || stderr.contains("command not found")
                || stderr.contains("npm err! 404")
                || stderr.contains("err_pnpm_recursive_exec_first_fail"))
    }
}

/// Run `program args...` in `cwd`, killing it after `timeout`.
pub async fn run(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Result<CommandOutput, ExecError> {
    run_inner(program, args, cwd, timeout, None).await
}

/// Like [`run`], feeding `input` to the process on stdin.
pub async fn run_with_input(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
    input: &[u8],
) -> Result<CommandOutput, ExecError> {
    run_inner(program, args, cwd, timeout, Some(input)).await
}

async fn run_inner(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
    input: Option<&[u8]>,
) -> Result<CommandOutput, ExecError> {
    debug!(program, ?args, cwd = %cwd.display(), "spawning");

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| spawn_error(program, e))?;

    if let Some(bytes) = input {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(bytes).await.map_err(|e| ExecError::Io {
                program: program.to_string(),
                source: e,
            })?;
        }
    }

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| ExecError::Io {
            program: program.to_string(),
            source: e,
        })?,
        Err(_) => {
            return Err(ExecError::Timeout {
                program: program.to_string(),
                secs: timeout.as_secs(),
            })
        }
    };

    let result = CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(program, code = ?result.code, "finished");
    Ok(result)
}

fn spawn_error(program: &str, e: std::io::Error) -> ExecError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ExecError::NotInstalled(program.to_string())
    } else {
        ExecError::Io {
            program: program.to_string(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_not_installed() {
        let cwd = std::env::temp_dir();
        let err = run("definitely-not-a-real-binary-xyz", &[], &cwd, DEFAULT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::NotInstalled(_)));
        assert_eq!(err.to_string(), "definitely-not-a-real-binary-xyz not installed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_process_times_out() {
        let cwd = std::env::temp_dir();
        let started = std::time::Instant::now();
        let err = run("sleep", &["5"], &cwd, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(matches!(err, ExecError::Timeout { ref program, .. } if program == "sleep"));
        assert_eq!(err.to_string(), "sleep timed out after 0s");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_becomes_error_result() {
        let ctx = crate::tools::ToolContext {
            root: std::env::temp_dir(),
            timeout: Duration::from_millis(100),
        };
        let err = ctx.exec("sleep", &["5"]).await.unwrap_err();
        let result = crate::tools::code::eslint::INFO.exec_failure(err);
        assert!(!result.passed);
        assert_eq!(result.violations.len(), 1);
        assert!(result.violations[0].message.contains("timed out"));
    }

    #[test]
    fn test_excerpt_is_truncated() {
        let output = CommandOutput {
            code: Some(1),
            stdout: "x".repeat(800),
            stderr: String::new(),
        };
        assert_eq!(output.excerpt().len(), 503);
    }

    #[test]
    fn test_reports_missing_tool() {
        let output = CommandOutput {
            code: Some(1),
            stdout: String::new(),
            stderr: "npm ERR! could not determine executable to run".to_string(),
        };
        assert!(output.reports_missing_tool());

        let ok = CommandOutput {
            code: Some(0),
            ..output
        };
        assert!(!ok.reports_missing_tool());
    }
}

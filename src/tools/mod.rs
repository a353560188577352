//! Tool adapters.
//!
//! Each adapter wraps exactly one external tool (or API) and a parser for
//! its output. Adapters never write to the repository; they read files,
//! spawn a process, and turn what comes back into [`Violation`]s.
//!
//! The shared error taxonomy:
//! - binary not installed: skipped, not a failure
//! - timeout or spawn failure: one synthetic error violation
//! - non-zero exit with unparseable output: one synthetic error violation
//!   carrying an excerpt of the output
//! - zero exit and nothing parsed: pass

pub mod code;
pub mod exec;
pub mod infra;
pub mod process;

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use lazy_static::lazy_static;
use regex::Regex;

use crate::check::{CheckResult, Violation};
use crate::config::Config;
use exec::{CommandOutput, ExecError};

/// Static identity of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolInfo {
    /// Tool identifier stamped on violations (`eslint`)
    pub id: &'static str,
    /// Display name (`ESLint`)
    pub name: &'static str,
    /// Config path of the check (`code.linting.eslint`)
    pub rule: &'static str,
}

impl ToolInfo {
    pub fn violation(&self, message: impl Into<String>) -> Violation {
        Violation::new(self.rule, self.id, message)
    }

    pub fn result(&self, violations: Vec<Violation>) -> CheckResult {
        CheckResult::from_violations(self.name, self.rule, violations)
    }

    pub fn pass(&self) -> CheckResult {
        self.result(Vec::new())
    }

    pub fn skip(&self, reason: impl Into<String>) -> CheckResult {
        CheckResult::skip(self.name, self.rule, reason)
    }

    pub fn error(&self, message: impl Into<String>) -> CheckResult {
        CheckResult::error(self.name, self.rule, self.id, message)
    }

    /// Map an invocation failure onto the error taxonomy.
    pub fn exec_failure(&self, err: ExecError) -> CheckResult {
        match err {
            ExecError::NotInstalled(program) => self.skip(format!("{} not installed", program)),
            other => self.error(other.to_string()),
        }
    }

    /// Synthetic failure for output that could not be parsed.
    pub fn unparseable(&self, output: &CommandOutput) -> CheckResult {
        let code = output
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        self.error(format!(
            "{} exited with code {}: {}",
            self.id,
            code,
            output.excerpt()
        ))
    }

    /// Skip when a wrapper reports the tool missing, else `None`.
    pub fn missing_tool(&self, output: &CommandOutput) -> Option<CheckResult> {
        if output.reports_missing_tool() {
            Some(self.skip(format!("{} not installed", self.id)))
        } else {
            None
        }
    }
}

/// Per-run environment shared by every adapter.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub root: PathBuf,
    pub timeout: Duration,
}

impl ToolContext {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            timeout: exec::DEFAULT_TIMEOUT,
        }
    }

    /// Context for `root` using the configured subprocess timeout.
    pub fn for_config<P: AsRef<Path>>(root: P, config: &Config) -> Self {
        Self::new(root).timeout(Duration::from_secs(config.settings.timeout_secs))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a program in the project root with the configured timeout.
    pub async fn exec(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ExecError> {
        exec::run(program, args, &self.root, self.timeout).await
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }

    /// First of `candidates` present in the root.
    pub fn find_any(&self, candidates: &[&str]) -> Option<PathBuf> {
        candidates
            .iter()
            .map(|c| self.root.join(c))
            .find(|p| p.exists())
    }
}

/// The adapter contract.
///
/// `run` executes the real check. `audit` verifies static configuration
/// without executing the tool; the default treats the adapter as having
/// nothing to audit.
pub trait Tool: Send + Sync {
    fn info(&self) -> ToolInfo;

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>>;

    fn audit<'a>(&'a self, _ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        future::ready(Ok(self.info().pass())).boxed()
    }
}

lazy_static! {
    static ref ANSI_ESCAPE: Regex = Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").unwrap();
}

/// Remove terminal color/control sequences.
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Make `path` relative to `root` with forward slashes, when possible.
pub fn relative_path(path: &str, root: &Path) -> String {
    let p = Path::new(path);
    p.strip_prefix(root)
        .map(|r| r.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| path.to_string())
}

//! Pull request size and issue linkage, from the GitHub Actions event payload.

use std::path::PathBuf;

use futures::future::{BoxFuture, FutureExt};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::check::{CheckResult, Violation};
use crate::config::PrConfig;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "pr",
    name: "Pull Request",
    rule: "process.pr",
};

lazy_static! {
    /// `#123`, `owner/repo#123` or a tracker key such as `PROJ-123`.
    static ref ISSUE_REF: Regex = Regex::new(r"(?:[\w.-]+/[\w.-]+)?#\d+|\b[A-Z][A-Z0-9]+-\d+\b").unwrap();
}

pub struct Pr {
    config: PrConfig,
}

impl Pr {
    pub fn new(config: PrConfig) -> Self {
        Self { config }
    }

    async fn check(&self, _ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        let Some(path) = std::env::var_os("GITHUB_EVENT_PATH").map(PathBuf::from) else {
            return Ok(INFO.skip("Not running in a pull request context"));
        };
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(e) => {
                return Ok(INFO.error(format!(
                    "Cannot read GITHUB_EVENT_PATH {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let event: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => return Ok(INFO.error(format!("Invalid event payload: {}", e))),
        };
        Ok(check_event(&event, &self.config))
    }
}

impl Tool for Pr {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

/// Evaluate a `pull_request` event payload. Other events are skipped.
pub fn check_event(event: &Value, config: &PrConfig) -> CheckResult {
    let Some(pr) = event.get("pull_request") else {
        return INFO.skip("Event is not a pull request");
    };
    let mut violations: Vec<Violation> = Vec::new();

    if let Some(max) = config.max_files {
        let files = pr.get("changed_files").and_then(Value::as_u64).unwrap_or(0);
        if files > max {
            violations.push(INFO.violation(format!(
                "PR changes {} files, max {}",
                files, max
            )));
        }
    }

    if let Some(max) = config.max_lines {
        let additions = pr.get("additions").and_then(Value::as_u64).unwrap_or(0);
        let deletions = pr.get("deletions").and_then(Value::as_u64).unwrap_or(0);
        let lines = additions + deletions;
        if lines > max {
            violations.push(INFO.violation(format!(
                "PR changes {} lines, max {}",
                lines, max
            )));
        }
    }

    if config.require_issue {
        let title = pr.get("title").and_then(Value::as_str).unwrap_or("");
        let body = pr.get("body").and_then(Value::as_str).unwrap_or("");
        if !ISSUE_REF.is_match(title) && !ISSUE_REF.is_match(body) {
            violations.push(INFO.violation("PR does not reference an issue"));
        }
    }

    INFO.result(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> PrConfig {
        PrConfig {
            enabled: true,
            max_files: Some(10),
            max_lines: Some(400),
            require_issue: true,
        }
    }

    #[test]
    fn test_small_linked_pr_passes() {
        let event = json!({"pull_request": {"title": "Fix login", "body": "Closes #42",
            "changed_files": 3, "additions": 40, "deletions": 10}});
        assert!(check_event(&event, &config()).passed);
    }

    #[test]
    fn test_large_unlinked_pr() {
        let event = json!({"pull_request": {"title": "Big refactor", "body": null,
            "changed_files": 25, "additions": 900, "deletions": 300}});
        let result = check_event(&event, &config());
        let messages: Vec<&str> = result.violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "PR changes 25 files, max 10",
                "PR changes 1200 lines, max 400",
                "PR does not reference an issue",
            ]
        );
    }

    #[test]
    fn test_push_event_skipped() {
        let event = json!({"ref": "refs/heads/main"});
        assert!(check_event(&event, &config()).skipped);
    }
}

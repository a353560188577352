//! Branch naming policy.

use futures::future::{BoxFuture, FutureExt};
use regex::Regex;

use crate::check::{CheckResult, Violation};
use crate::config::BranchesConfig;
use crate::tools::process::git;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "branches",
    name: "Branches",
    rule: "process.branches",
};

pub struct Branches {
    config: BranchesConfig,
}

impl Branches {
    pub fn new(config: BranchesConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        if self.config.pattern.is_none() {
            return Ok(INFO.skip("No branch pattern configured"));
        }
        let branch = match git::current_branch(ctx).await {
            Ok(Some(b)) => b,
            Ok(None) => return Ok(INFO.skip("Not on a branch")),
            Err(e) => return Ok(INFO.exec_failure(e)),
        };
        Ok(INFO.result(validate_branch(&branch, &self.config)?))
    }
}

impl Tool for Branches {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

/// Check one branch name. Excluded names always pass.
pub fn validate_branch(branch: &str, config: &BranchesConfig) -> anyhow::Result<Vec<Violation>> {
    let Some(pattern) = &config.pattern else {
        return Ok(Vec::new());
    };
    if config.exclude.iter().any(|e| e == branch) {
        return Ok(Vec::new());
    }

    let re = Regex::new(pattern)?;
    if re.is_match(branch) {
        Ok(Vec::new())
    } else {
        Ok(vec![INFO.violation(format!(
            "Branch \"{}\" does not match pattern \"{}\"",
            branch, pattern
        ))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BranchesConfig {
        BranchesConfig {
            enabled: true,
            pattern: Some(r"^(feature|fix|chore)/[a-z0-9-]+$".to_string()),
            exclude: vec!["main".to_string()],
        }
    }

    #[test]
    fn test_validate_branch() {
        let cfg = config();
        assert!(validate_branch("feature/login-page", &cfg).unwrap().is_empty());
        assert!(validate_branch("main", &cfg).unwrap().is_empty());

        let violations = validate_branch("my_branch", &cfg).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.starts_with("Branch \"my_branch\" does not match"));
    }

    #[test]
    fn test_no_pattern_passes() {
        let cfg = BranchesConfig {
            pattern: None,
            ..config()
        };
        assert!(validate_branch("anything", &cfg).unwrap().is_empty());
    }
}

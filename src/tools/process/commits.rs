//! Conventional commit messages.

use futures::future::{BoxFuture, FutureExt};
use lazy_static::lazy_static;
use regex::Regex;

use crate::check::{CheckResult, Violation};
use crate::config::CommitsConfig;
use crate::tools::process::git;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "commits",
    name: "Commits",
    rule: "process.commits",
};

lazy_static! {
    /// `type(scope)!: subject`
    static ref CONVENTIONAL: Regex =
        Regex::new(r"^(?P<type>[a-zA-Z]+)(?:\((?P<scope>[^()]+)\))?(?P<breaking>!)?: (?P<subject>\S.*)$")
            .unwrap();
}

/// Subjects git generates itself.
fn is_generated(subject: &str) -> bool {
    subject.starts_with("Merge ")
        || subject.starts_with("Revert \"")
        || subject.starts_with("fixup! ")
        || subject.starts_with("squash! ")
}

pub struct Commits {
    config: CommitsConfig,
}

impl Commits {
    pub fn new(config: CommitsConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        let message = match git::last_commit_message(ctx).await {
            Ok(Some(m)) => m,
            Ok(None) => return Ok(INFO.skip("No commits found")),
            Err(e) => return Ok(INFO.exec_failure(e)),
        };
        Ok(INFO.result(validate_message(&message, &self.config)))
    }
}

impl Tool for Commits {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

pub fn validate_message(message: &str, config: &CommitsConfig) -> Vec<Violation> {
    let subject = git::subject(message);
    if is_generated(subject) {
        return Vec::new();
    }

    let Some(caps) = CONVENTIONAL.captures(subject) else {
        return vec![INFO.violation(format!(
            "Commit message \"{}\" does not follow the conventional format type(scope): subject",
            subject
        ))];
    };

    let mut violations = Vec::new();
    let commit_type = &caps["type"];
    if !config.types.iter().any(|t| t == commit_type) {
        violations.push(
            INFO.violation(format!(
                "Commit type \"{}\" is not allowed (allowed: {})",
                commit_type,
                config.types.join(", ")
            ))
            .code(commit_type.to_string()),
        );
    }
    if config.require_scope && caps.name("scope").is_none() {
        violations.push(INFO.violation("Commit scope is required"));
    }
    if let Some(max) = config.max_subject_length {
        let len = subject.chars().count();
        if len > max {
            violations.push(INFO.violation(format!(
                "Commit subject is {} characters, max {}",
                len, max
            )));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_messages() {
        let cfg = CommitsConfig::default();
        assert!(validate_message("feat: add login", &cfg).is_empty());
        assert!(validate_message("fix(api)!: drop v1\n\nBREAKING CHANGE: gone", &cfg).is_empty());
        assert!(validate_message("Merge branch 'main' into feature/x", &cfg).is_empty());
    }

    #[test]
    fn test_invalid_format() {
        let violations = validate_message("added stuff", &CommitsConfig::default());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("conventional format"));
    }

    #[test]
    fn test_type_scope_and_length() {
        let cfg = CommitsConfig {
            enabled: true,
            types: vec!["feat".to_string(), "fix".to_string()],
            require_scope: true,
            max_subject_length: Some(20),
        };
        let violations = validate_message("wip: a subject that is far too long", &cfg);
        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0].code.as_deref(), Some("wip"));
        assert_eq!(violations[1].message, "Commit scope is required");
        assert!(violations[2].message.starts_with("Commit subject is 35 characters"));
    }
}

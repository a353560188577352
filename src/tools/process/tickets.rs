//! Ticket references in commits and branch names.

use futures::future::{BoxFuture, FutureExt};
use regex::Regex;

use crate::check::{CheckResult, Violation};
use crate::config::TicketsConfig;
use crate::tools::process::git;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "tickets",
    name: "Tickets",
    rule: "process.tickets",
};

pub struct Tickets {
    config: TicketsConfig,
}

impl Tickets {
    pub fn new(config: TicketsConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        let re = Regex::new(&self.config.pattern)?;
        let mut violations = Vec::new();
        let mut checked = false;

        if self.config.require_in_commits {
            match git::last_commit_message(ctx).await {
                Ok(Some(message)) => {
                    checked = true;
                    violations.extend(check_commit(&message, &re, &self.config.pattern));
                }
                Ok(None) => {}
                Err(e) => return Ok(INFO.exec_failure(e)),
            }
        }

        if self.config.require_in_branch {
            match git::current_branch(ctx).await {
                Ok(Some(branch)) => {
                    checked = true;
                    violations.extend(check_branch(&branch, &re, &self.config.pattern));
                }
                Ok(None) => {}
                Err(e) => return Ok(INFO.exec_failure(e)),
            }
        }

        if !checked {
            return Ok(INFO.skip("No commit or branch to check"));
        }
        Ok(INFO.result(violations))
    }
}

impl Tool for Tickets {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }
}

pub fn check_commit(message: &str, re: &Regex, pattern: &str) -> Option<Violation> {
    let subject = git::subject(message);
    if subject.starts_with("Merge ") || re.is_match(message) {
        return None;
    }
    Some(INFO.violation(format!(
        "Commit message does not reference a ticket matching \"{}\"",
        pattern
    )))
}

pub fn check_branch(branch: &str, re: &Regex, pattern: &str) -> Option<Violation> {
    if re.is_match(branch) {
        return None;
    }
    Some(INFO.violation(format!(
        "Branch \"{}\" does not reference a ticket matching \"{}\"",
        branch, pattern
    )))
}

/// Validate a commit message against the ticket rules, for commit-msg hooks.
pub fn validate_message(message: &str, config: &TicketsConfig) -> anyhow::Result<Vec<Violation>> {
    if !config.require_in_commits {
        return Ok(Vec::new());
    }
    let re = Regex::new(&config.pattern)?;
    Ok(check_commit(message, &re, &config.pattern).into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TicketsConfig {
        TicketsConfig {
            enabled: true,
            pattern: r"[A-Z]+-\d+".to_string(),
            require_in_commits: true,
            require_in_branch: true,
        }
    }

    #[test]
    fn test_commit_reference() {
        let cfg = config();
        assert!(validate_message("feat: login (PROJ-123)", &cfg).unwrap().is_empty());
        assert!(validate_message("feat: login\n\nRefs PROJ-9", &cfg).unwrap().is_empty());
        assert_eq!(validate_message("feat: login", &cfg).unwrap().len(), 1);
    }

    #[test]
    fn test_branch_reference() {
        let re = Regex::new(r"[A-Z]+-\d+").unwrap();
        assert!(check_branch("feature/PROJ-12-login", &re, "").is_none());
        assert!(check_branch("feature/login", &re, "").is_some());
    }
}

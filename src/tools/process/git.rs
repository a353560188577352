//! Read-only git queries shared by the process adapters.

use crate::tools::exec::ExecError;
use crate::tools::ToolContext;

/// Current branch name. `None` when detached or outside a repository.
///
/// Pull-request builds on GitHub Actions check out a detached merge
/// commit, so `GITHUB_HEAD_REF` takes precedence when set.
pub async fn current_branch(ctx: &ToolContext) -> Result<Option<String>, ExecError> {
    if let Ok(head) = std::env::var("GITHUB_HEAD_REF") {
        if !head.trim().is_empty() {
            return Ok(Some(head.trim().to_string()));
        }
    }

    let output = ctx.exec("git", &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
    if !output.success() {
        return Ok(None);
    }
    let name = output.stdout.trim();
    if name.is_empty() || name == "HEAD" {
        Ok(None)
    } else {
        Ok(Some(name.to_string()))
    }
}

/// Full message of the most recent commit.
pub async fn last_commit_message(ctx: &ToolContext) -> Result<Option<String>, ExecError> {
    let output = ctx.exec("git", &["log", "-1", "--format=%B"]).await?;
    let message = output.stdout.trim();
    if !output.success() || message.is_empty() {
        Ok(None)
    } else {
        Ok(Some(message.to_string()))
    }
}

pub async fn origin_url(ctx: &ToolContext) -> Result<Option<String>, ExecError> {
    let output = ctx.exec("git", &["remote", "get-url", "origin"]).await?;
    let url = output.stdout.trim();
    if !output.success() || url.is_empty() {
        Ok(None)
    } else {
        Ok(Some(url.to_string()))
    }
}

/// Drop the comment lines and scissors section git adds to message files.
pub fn clean_message(raw: &str) -> String {
    let mut lines = Vec::new();
    for line in raw.lines() {
        if line.starts_with("# ------------------------ >8 ------------------------") {
            break;
        }
        if line.starts_with('#') {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

/// First line of a commit message.
pub fn subject(message: &str) -> &str {
    message.lines().next().unwrap_or("").trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_message() {
        let raw = "feat(api): add endpoint\n\nBody text\n# Please enter the commit message\n# ------------------------ >8 ------------------------\ndiff --git a/x b/x\n";
        assert_eq!(clean_message(raw), "feat(api): add endpoint\n\nBody text");
        assert_eq!(subject(&clean_message(raw)), "feat(api): add endpoint");
    }
}

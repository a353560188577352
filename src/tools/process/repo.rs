//! Repository settings: CODEOWNERS and branch protection.
//!
//! Branch protection is read through `gh api`. The same comparison backs
//! `process diff`, and `process sync --apply` writes the desired settings.

use std::path::Path;

use anyhow::Context;
use futures::future::{self, BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::check::{CheckResult, Violation};
use crate::config::{RepoConfig, RulesetConfig};
use crate::tools::process::github::{self, GhError, GithubRepo};
use crate::tools::exec::ExecError;
use crate::tools::{Tool, ToolContext, ToolInfo};

pub const INFO: ToolInfo = ToolInfo {
    id: "repo",
    name: "Repository",
    rule: "process.repo",
};

const CODEOWNERS_PATHS: &[&str] = &["CODEOWNERS", ".github/CODEOWNERS", "docs/CODEOWNERS"];

/// One setting whose live value differs from the desired one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtectionDiff {
    pub setting: &'static str,
    pub expected: Value,
    pub actual: Value,
}

impl std::fmt::Display for ProtectionDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: expected {}, actual {}",
            self.setting, self.expected, self.actual
        )
    }
}

pub struct Repo {
    config: RepoConfig,
}

impl Repo {
    pub fn new(config: RepoConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ToolContext) -> anyhow::Result<CheckResult> {
        let mut violations = Vec::new();
        if self.config.require_codeowners {
            violations.extend(check_codeowners(&ctx.root));
        }

        let wants_protection =
            self.config.require_branch_protection || self.config.ruleset.is_some();
        if !wants_protection {
            return Ok(INFO.result(violations));
        }

        // Without GitHub context, protection cannot be checked; local
        // findings still count.
        let skip = |reason: String, violations: Vec<Violation>| {
            if violations.is_empty() {
                INFO.skip(reason)
            } else {
                INFO.result(violations)
            }
        };

        let repo = match github::resolve_repo(ctx).await {
            Ok(Some(r)) => r,
            Ok(None) => return Ok(skip("No GitHub remote found".to_string(), violations)),
            Err(ExecError::NotInstalled(p)) => {
                return Ok(skip(format!("{} not installed", p), violations))
            }
            Err(e) => return Ok(INFO.error(e.to_string())),
        };

        let ruleset = self.config.ruleset.clone().unwrap_or_default();
        let protection = match fetch_protection(ctx, &repo, &ruleset.branch).await {
            Ok(p) => p,
            Err(GhError::Exec(ExecError::NotInstalled(p))) => {
                return Ok(skip(format!("{} not installed", p), violations))
            }
            Err(e) => return Ok(INFO.error(e.to_string())),
        };

        match protection {
            None => violations.push(INFO.violation(format!(
                "Branch \"{}\" is not protected",
                ruleset.branch
            ))),
            Some(live) => {
                if let Some(desired) = &self.config.ruleset {
                    violations.extend(diff_protection(desired, Some(&live)).into_iter().map(|d| {
                        INFO.violation(format!(
                            "Branch \"{}\" protection {}",
                            desired.branch, d
                        ))
                        .code(d.setting)
                    }));
                }
            }
        }

        Ok(INFO.result(violations))
    }
}

impl Tool for Repo {
    fn info(&self) -> ToolInfo {
        INFO
    }

    fn run<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        self.check(ctx).boxed()
    }

    fn audit<'a>(&'a self, ctx: &'a ToolContext) -> BoxFuture<'a, anyhow::Result<CheckResult>> {
        let violations = if self.config.require_codeowners {
            check_codeowners(&ctx.root)
        } else {
            Vec::new()
        };
        future::ready(Ok(INFO.result(violations))).boxed()
    }
}

pub fn check_codeowners(root: &Path) -> Vec<Violation> {
    if CODEOWNERS_PATHS.iter().any(|p| root.join(p).is_file()) {
        Vec::new()
    } else {
        vec![INFO.violation("CODEOWNERS file not found")]
    }
}

/// Live protection of `branch`. `None` when the branch is unprotected.
pub async fn fetch_protection(
    ctx: &ToolContext,
    repo: &GithubRepo,
    branch: &str,
) -> Result<Option<Value>, GhError> {
    let endpoint = repo.protection_endpoint(branch);
    debug!(%endpoint, "fetching branch protection");
    github::api_get(ctx, &endpoint).await
}

/// Compare desired settings with the protection API response.
/// Settings left unset in the config are not compared.
pub fn diff_protection(desired: &RulesetConfig, live: Option<&Value>) -> Vec<ProtectionDiff> {
    let null = Value::Null;
    let live = live.unwrap_or(&null);
    let reviews = live.get("required_pull_request_reviews");
    let mut diffs = Vec::new();

    let mut compare = |setting: &'static str, expected: Value, actual: Value| {
        if expected != actual {
            diffs.push(ProtectionDiff {
                setting,
                expected,
                actual,
            });
        }
    };

    if let Some(n) = desired.required_reviews {
        let actual = reviews
            .and_then(|r| r.get("required_approving_review_count"))
            .cloned()
            .unwrap_or(json!(0));
        compare("required_reviews", json!(n), actual);
    }
    if let Some(b) = desired.dismiss_stale_reviews {
        let actual = reviews
            .and_then(|r| r.get("dismiss_stale_reviews"))
            .cloned()
            .unwrap_or(json!(false));
        compare("dismiss_stale_reviews", json!(b), actual);
    }
    if let Some(b) = desired.require_code_owner_reviews {
        let actual = reviews
            .and_then(|r| r.get("require_code_owner_reviews"))
            .cloned()
            .unwrap_or(json!(false));
        compare("require_code_owner_reviews", json!(b), actual);
    }
    if !desired.require_status_checks.is_empty() {
        let mut expected = desired.require_status_checks.clone();
        expected.sort();
        let mut actual: Vec<String> = live
            .get("required_status_checks")
            .and_then(|c| c.get("contexts"))
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        actual.sort();
        compare("require_status_checks", json!(expected), json!(actual));
    }
    if let Some(b) = desired.enforce_admins {
        let actual = live
            .get("enforce_admins")
            .and_then(|e| e.get("enabled"))
            .cloned()
            .unwrap_or(json!(false));
        compare("enforce_admins", json!(b), actual);
    }

    diffs
}

/// Body for `PUT /repos/{owner}/{repo}/branches/{branch}/protection`.
pub fn protection_payload(desired: &RulesetConfig) -> Value {
    let status_checks = if desired.require_status_checks.is_empty() {
        Value::Null
    } else {
        json!({ "strict": true, "contexts": desired.require_status_checks })
    };
    let reviews = if desired.required_reviews.is_some()
        || desired.dismiss_stale_reviews.is_some()
        || desired.require_code_owner_reviews.is_some()
    {
        json!({
            "required_approving_review_count": desired.required_reviews.unwrap_or(1),
            "dismiss_stale_reviews": desired.dismiss_stale_reviews.unwrap_or(false),
            "require_code_owner_reviews": desired.require_code_owner_reviews.unwrap_or(false),
        })
    } else {
        Value::Null
    };

    json!({
        "required_status_checks": status_checks,
        "enforce_admins": desired.enforce_admins.unwrap_or(false),
        "required_pull_request_reviews": reviews,
        "restrictions": null,
    })
}

/// Repository and live diff for the configured ruleset.
pub async fn live_diff(
    ctx: &ToolContext,
    desired: &RulesetConfig,
) -> anyhow::Result<(GithubRepo, Vec<ProtectionDiff>)> {
    let repo = github::resolve_repo(ctx)
        .await?
        .context("no GitHub repository found (set GITHUB_REPOSITORY or an origin remote)")?;
    let live = fetch_protection(ctx, &repo, &desired.branch).await?;
    let diffs = diff_protection(desired, live.as_ref());
    Ok((repo, diffs))
}

/// Write the desired protection to GitHub.
pub async fn apply_protection(
    ctx: &ToolContext,
    repo: &GithubRepo,
    desired: &RulesetConfig,
) -> anyhow::Result<()> {
    let endpoint = repo.protection_endpoint(&desired.branch);
    github::api_put(ctx, &endpoint, &protection_payload(desired))
        .await
        .with_context(|| format!("failed to update protection of {}:{}", repo, desired.branch))?;
    Ok(())
}
